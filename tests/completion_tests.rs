//! Completion, ranking and hover scenarios against the fixture schema

mod common;

use std::sync::Arc;

use appconfig_language_server::complete::{complete, hover, Proposal};
use appconfig_language_server::docmodel::Dialect;
use appconfig_language_server::metadata::{build_session, parse_document};
use appconfig_language_server::reconcile::ProblemKind;
use appconfig_language_server::schema::{HintProvider, StaticHint};
use appconfig_language_server::session::ProjectSession;

use common::{reconcile_props, session};

fn complete_yaml(session: &ProjectSession, text: &str, offset: usize) -> Vec<Proposal> {
    let root = Dialect::Yaml.parse(text).expect("document parses");
    complete(session, &root, text, offset)
}

fn complete_props(session: &ProjectSession, text: &str, offset: usize) -> Vec<Proposal> {
    let root = Dialect::Properties.parse(text).expect("document parses");
    complete(session, &root, text, offset)
}

fn labels(proposals: &[Proposal]) -> Vec<String> {
    proposals.iter().map(|p| p.label.clone()).collect()
}

#[test]
fn test_root_key_completion_on_fragment() {
    let session = session();
    let text = "ser\n";
    let proposals = complete_yaml(&session, text, 3);

    assert!(!proposals.is_empty());
    assert!(proposals
        .iter()
        .all(|p| p.new_text.starts_with("server.")));
    assert!(proposals.iter().any(|p| p.new_text == "server.port"));
}

#[test]
fn test_empty_document_completes_all_roots() {
    let session = session();
    let proposals = complete_yaml(&session, "", 0);
    assert!(proposals.iter().any(|p| p.new_text == "server.port"));
    assert!(proposals.iter().any(|p| p.new_text == "app.mode"));
}

#[test]
fn test_nested_key_completion_under_group() {
    let session = session();
    // Mid-keystroke line under `server:`.
    let text = "server:\n  po\n";
    let offset = text.find("po").unwrap() + 2;
    let proposals = complete_yaml(&session, text, offset);

    assert!(proposals.iter().any(|p| p.new_text == "port"));
    // Everything proposed is relative to the `server` group.
    assert!(proposals.iter().all(|p| !p.new_text.starts_with("server.")));
}

#[test]
fn test_symmetry_every_valid_property_is_proposable() {
    let session = session();

    for info in session.index.iter() {
        let id = info.id.clone();
        let text = format!("{}=", id);
        let proposals = complete_props(&session, &text, id.len());
        assert!(
            proposals.iter().any(|p| p.new_text == id),
            "`{}` validates but is not proposed at its own key position",
            id
        );
    }
}

#[test]
fn test_symmetry_every_proposal_validates() {
    let session = session();
    let proposals = complete_props(&session, "", 0);
    assert!(!proposals.is_empty());

    for proposal in &proposals {
        let text = format!("{}=", proposal.new_text);
        let problems = reconcile_props(&session, &text);
        assert!(
            problems
                .iter()
                .all(|p| p.kind != ProblemKind::UnknownProperty),
            "proposed `{}` does not validate",
            proposal.new_text
        );
    }
}

#[test]
fn test_completion_is_deterministic() {
    let session = session();
    let text = "server:\n  s\n";
    let offset = text.rfind('s').unwrap() + 1;
    let first = labels(&complete_yaml(&session, text, offset));
    let second = labels(&complete_yaml(&session, text, offset));
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn test_deprecated_demoted_not_excluded() {
    let json = r#"{
      "properties": [
        {"name": "aaa.flag", "type": "string"},
        {"name": "bbb.flag", "type": "string",
         "deprecation": {"replacement": "bbb.new"}}
      ]
    }"#;
    let session = build_session(parse_document(json).unwrap()).unwrap();

    let text = "flag\n";
    let proposals = complete_yaml(&session, text, 4);

    assert_eq!(proposals.len(), 2);
    // Same fuzzy match, but the deprecated one sinks.
    assert_eq!(proposals[0].new_text, "aaa.flag");
    assert_eq!(proposals[1].new_text, "bbb.flag");
    assert!(proposals[1].deprecated);
    assert_eq!(proposals[1].label, "bbb.flag → bbb.new");
}

#[test]
fn test_enum_value_completion() {
    let session = session();
    let text = "app:\n  mode: \n";
    let offset = text.find("mode: ").unwrap() + "mode: ".len();
    let proposals = complete_yaml(&session, text, offset);

    assert_eq!(labels(&proposals).len(), 3);
    for value in ["DEV", "TEST", "PROD"] {
        assert!(proposals.iter().any(|p| p.label == value));
    }
}

#[test]
fn test_boolean_value_completion() {
    let session = session();
    let text = "app:\n  debug: \n";
    let offset = text.find("debug: ").unwrap() + "debug: ".len();
    let proposals = complete_yaml(&session, text, offset);

    assert_eq!(labels(&proposals), vec!["true", "false"]);
}

#[test]
fn test_property_level_value_hints() {
    let session = session();
    let text = "server:\n  port: \n";
    let offset = text.find("port: ").unwrap() + "port: ".len();
    let proposals = complete_yaml(&session, text, offset);

    let mut values = labels(&proposals);
    values.sort();
    assert_eq!(values, vec!["8080", "8443"]);
}

#[test]
fn test_value_fragment_filters_hints() {
    let session = session();
    let text = "app:\n  mode: TE\n";
    let offset = text.find("TE").unwrap() + 2;
    let proposals = complete_yaml(&session, text, offset);

    assert_eq!(labels(&proposals), vec!["TEST"]);
}

struct ExtraModes;

impl HintProvider for ExtraModes {
    fn hints(&self, _query: &str) -> Vec<StaticHint> {
        vec![
            StaticHint::with_description("CANARY", "Discovered at runtime"),
            // Already statically known; must not duplicate.
            StaticHint::new("DEV"),
        ]
    }
}

#[test]
fn test_dynamic_hint_provider_merged_without_duplicates() {
    let mut session = session();
    session.register_hint_provider("RunMode", Arc::new(ExtraModes));

    let text = "app:\n  mode: \n";
    let offset = text.find("mode: ").unwrap() + "mode: ".len();
    let proposals = complete_yaml(&session, text, offset);

    let mut values = labels(&proposals);
    values.sort();
    assert_eq!(values, vec!["CANARY", "DEV", "PROD", "TEST"]);
}

#[test]
fn test_bean_property_key_completion() {
    let session = session();
    let text = "server:\n  ssl:\n    en\n";
    let offset = text.find("en").unwrap() + 2;
    let proposals = complete_yaml(&session, text, offset);

    assert!(proposals.iter().any(|p| p.new_text == "enabled"));
}

#[test]
fn test_chained_dotted_fragment_completion() {
    let session = session();
    let text = "server.ssl.prot\n";
    let proposals = complete_yaml(&session, text, text.len() - 1);

    assert!(proposals
        .iter()
        .any(|p| p.new_text == "server.ssl.protocols"));
}

#[test]
fn test_map_key_completion_from_enum_key_type() {
    let session = session();
    let text = "app:\n  flags:\n    D\n";
    let offset = text.find("D\n").unwrap() + 1;
    let proposals = complete_yaml(&session, text, offset);

    // DEV matches at the boundary, PROD contains a trailing D.
    assert!(proposals.iter().any(|p| p.new_text == "DEV"));
    assert_eq!(proposals[0].new_text, "DEV");
}

#[test]
fn test_hover_on_property_key() {
    let session = session();
    let text = "server:\n  port: 8080\n";
    let offset = text.find("port").unwrap() + 2;
    let doc = hover(&session, &Dialect::Yaml.parse(text).unwrap(), text, offset)
        .expect("hover content");

    assert!(doc.markdown.contains("server.port"));
    assert!(doc.markdown.contains("8080"));
    assert!(doc.markdown.contains("Port the server listens on."));
    let start = text.find("port").unwrap();
    assert_eq!((doc.span.start, doc.span.end), (start, start + 4));
}

#[test]
fn test_hover_on_bean_property_key() {
    let session = session();
    let text = "server:\n  ssl:\n    keyStore: /etc/keys\n";
    let offset = text.find("keyStore").unwrap() + 3;
    let doc = hover(&session, &Dialect::Yaml.parse(text).unwrap(), text, offset)
        .expect("hover content");

    assert!(doc.markdown.contains("key-store"));
    assert!(doc.markdown.contains("Path to the key store."));
    assert!(doc.markdown.contains("SslConfig"));
}

#[test]
fn test_hover_on_deprecated_property_mentions_replacement() {
    let session = session();
    let text = "logging.level: INFO\n";
    let offset = text.find("level").unwrap() + 1;
    let doc = hover(&session, &Dialect::Yaml.parse(text).unwrap(), text, offset)
        .expect("hover content");

    assert!(doc.markdown.contains("Deprecated"));
    assert!(doc.markdown.contains("logging.level.root"));
}

#[test]
fn test_hover_on_unknown_key_is_none() {
    let session = session();
    let text = "nonsense: 1\n";
    let offset = 3;
    assert!(hover(&session, &Dialect::Yaml.parse(text).unwrap(), text, offset).is_none());
}
