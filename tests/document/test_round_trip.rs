use gisquick_cli::core::document::{Document, Scalar};
use gisquick_cli::core::ErrorCategory;
use std::fs;
use std::path::Path;

fn assert_round_trip(source: &str) {
    let doc = Document::load(source).unwrap_or_else(|e| panic!("{}: {}", e, source));
    assert_eq!(doc.serialize(), source);
}

#[test]
fn shipped_templates_round_trip() {
    let template = Path::new(env!("CARGO_MANIFEST_DIR")).join("template");
    for file in [
        "docker-compose.yml",
        "prometheus/prometheus.yml",
        "loki/loki.yml",
        "promtail/promtail.yml",
    ] {
        let source = fs::read_to_string(template.join(file)).unwrap();
        assert_round_trip(&source);
    }
}

#[test]
fn comments_and_blank_lines_are_kept() {
    assert_round_trip(
        "# head comment\n---\nservices:\n  app:\n    image: gisquick/server  # pinned by release\n    # about ports\n    ports: []\n    labels: {}\n\n\n  redis:\n    image: redis\n",
    );
    assert_round_trip("a:\n  b: 1\n# column zero comment\n  c: 2\n");
}

#[test]
fn scalar_quoting_is_preserved() {
    assert_round_trip(
        "env:\n  - 'single'\n  - \"double \\\"escaped\\\"\"\n  - 'it''s'\n  - plain value\nport: \"3000\"\nempty: ''\nnothing: ~\nflag: yes\n",
    );
}

#[test]
fn flow_sequences_are_preserved() {
    assert_round_trip(
        "redis:\n  command: [\"redis-server\", '/etc/redis.conf', --save]\n  targets: ['a, b', c]\n",
    );
}

#[test]
fn source_spacing_is_preserved() {
    for source in [
        "command: [\"redis-server\",\"/etc/redis.conf\"]\n",
        "ports: [ ]\n",
        "targets: [ a, b ]\n",
        "image:  redis\n",
        "image: redis   \n",
        "volumes:\n  -   ./a:/a\n",
        "ports:\n  -   name: x\n      port: 1\n",
        "labels: { }\nkey :  value  # note\n",
    ] {
        assert_round_trip(source);
    }
}

#[test]
fn edited_flow_sequences_are_rendered_again() {
    let mut doc = Document::load("command: [ a,b ]\nports: [ ]\n").unwrap();
    doc.get_mut(&["ports"])
        .unwrap()
        .as_sequence_mut()
        .unwrap()
        .push(Scalar::string("x"));
    assert_eq!(doc.serialize(), "command: [ a,b ]\nports: [x]\n");
}

#[test]
fn alternative_layout_is_preserved() {
    assert_round_trip(
        "services:\n    app:\n        volumes:\n        - ./a:/a\n        - b:/b\n        environment:\n        - A=1\n",
    );
}

#[test]
fn missing_final_newline_is_preserved() {
    assert_round_trip("a: 1\nb: [x]");
    assert_round_trip("");
}

#[test]
fn sequences_of_mappings_round_trip() {
    assert_round_trip(
        "scrape_configs:\n  - job_name: node\n    static_configs:\n      - targets: ['node-exporter:9100']\n\n  - job_name: app\n    metrics_path: /api/metrics\n",
    );
}

#[test]
fn unsupported_constructs_report_their_line() {
    let cases = [
        ("services:\n  app:\n    image: &img gisquick/server\n", 3),
        ("a: b: c\n", 1),
        ("a:\n  - - nested\n", 2),
        ("a: [x, [y]]\n", 1),
        ("a: 1\r\nb: 2\r\n", 1),
        ("a:\n  b: |\n    text\n", 2),
        ("a: {b: 1}\n", 1),
    ];
    for (source, line) in cases {
        let err = Document::load(source).unwrap_err();
        assert_eq!(err.category, ErrorCategory::ParseError, "{:?}", source);
        assert_eq!(err.line(), Some(line), "{:?}", source);
    }
}

#[test]
fn root_must_be_a_mapping() {
    let err = Document::load("- a\n- b\n").unwrap_err();
    assert_eq!(err.category, ErrorCategory::ParseError);
    assert_eq!(err.line(), Some(1));
}
