#![allow(dead_code)]

//! Shared fixtures for engine integration tests

use indoc::indoc;
use url::Url;

use appconfig_language_server::docmodel::Dialect;
use appconfig_language_server::metadata::{build_session, parse_document};
use appconfig_language_server::reconcile::{reconcile_text, ReconcileProblem};
use appconfig_language_server::session::ProjectSession;

/// Metadata snapshot the tests validate and complete against.
pub const FIXTURE: &str = indoc! {r#"
    {
      "properties": [
        {"name": "server.port", "type": "port", "defaultValue": 8080,
         "description": "Port the server listens on."},
        {"name": "server.servlet.context-path", "type": "string",
         "description": "Context path of the application."},
        {"name": "server.servlet.session-timeout", "type": "duration"},
        {"name": "server.ssl", "type": "SslConfig"},
        {"name": "logging.level", "type": "string",
         "deprecation": {"level": "warning", "replacement": "logging.level.root"}},
        {"name": "app.mode", "type": "RunMode"},
        {"name": "app.debug", "type": "boolean"},
        {"name": "app.features", "type": "list<string>"},
        {"name": "app.ports", "type": "list<port>"},
        {"name": "app.profiles", "type": "union<string,list<string>>"},
        {"name": "app.levels", "type": "map<string,LogLevel>"},
        {"name": "app.thresholds", "type": "map<int,string>"},
        {"name": "app.env", "type": "map<string,string>"},
        {"name": "app.overrides", "type": "map<string,string>"},
        {"name": "app.flags", "type": "map<RunMode,boolean>"},
        {"name": "app.cache", "type": "string"},
        {"name": "app.cache.ttl", "type": "duration"}
      ],
      "types": [
        {"name": "SslConfig", "properties": [
          {"name": "enabled", "type": "boolean"},
          {"name": "key-store", "type": "string",
           "description": "Path to the key store."},
          {"name": "protocols", "type": "list<string>"},
          {"name": "legacy-protocol", "type": "string",
           "deprecation": {"level": "warning", "replacement": "protocols"}}
        ]}
      ],
      "enums": [
        {"name": "LogLevel", "values": [
          {"value": "TRACE"}, {"value": "DEBUG"}, {"value": "INFO"},
          {"value": "WARN"}, {"value": "ERROR"}
        ]},
        {"name": "RunMode", "values": [
          {"value": "DEV"}, {"value": "TEST"}, {"value": "PROD"}
        ]}
      ],
      "hints": [
        {"name": "server.port", "values": [{"value": 8080}, {"value": 8443}]}
      ]
    }
"#};

pub fn session() -> ProjectSession {
    build_session(parse_document(FIXTURE).expect("fixture parses"))
        .expect("fixture builds")
}

pub fn yaml_uri() -> Url {
    Url::parse("file:///project/config/application.yml").unwrap()
}

pub fn props_uri() -> Url {
    Url::parse("file:///project/config/application.properties").unwrap()
}

pub fn reconcile_yaml(session: &ProjectSession, text: &str) -> Vec<ReconcileProblem> {
    reconcile_text(session, &yaml_uri(), text, Dialect::Yaml)
}

pub fn reconcile_props(session: &ProjectSession, text: &str) -> Vec<ReconcileProblem> {
    reconcile_text(session, &props_uri(), text, Dialect::Properties)
}

/// Byte span of the first occurrence of `needle` in `text`.
pub fn span_of(text: &str, needle: &str) -> (usize, usize) {
    let start = text.find(needle).expect("needle present");
    (start, start + needle.len())
}
