use gisquick_cli::core::compose::canonicalize_service;
use gisquick_cli::core::document::{
    capture_trailing_blank, restore_trailing_blank, Document, Scalar, Sequence, TriviaSnapshot,
};

const SOURCE: &str = "\
services:
  app:
    image: gisquick/server
    volumes:
      - publish:/publish

  # Reverse proxy
  caddy:
    image: caddy:2
    ports: []

  redis:
    image: redis:7-alpine
";

#[test]
fn appending_to_a_block_keeps_the_separator_after_it() {
    let mut doc = Document::load(SOURCE).unwrap();
    let app = doc.root_mut().mapping_mut("services").unwrap().mapping_mut("app").unwrap();
    let marker = capture_trailing_blank(app).unwrap();
    assert_eq!(marker.count(), 1);
    let mut env = Sequence::new();
    env.push(Scalar::string("GISQUICK_SIGNUP_API=false"));
    app.insert("environment", env);
    restore_trailing_blank(app, marker);

    assert_eq!(
        doc.serialize(),
        "\
services:
  app:
    image: gisquick/server
    volumes:
      - publish:/publish
    environment:
      - GISQUICK_SIGNUP_API=false

  # Reverse proxy
  caddy:
    image: caddy:2
    ports: []

  redis:
    image: redis:7-alpine
"
    );
}

#[test]
fn removing_the_tail_entry_keeps_the_separator() {
    let mut doc = Document::load(SOURCE).unwrap();
    let app = doc.root_mut().mapping_mut("services").unwrap().mapping_mut("app").unwrap();
    let marker = capture_trailing_blank(app).unwrap();
    app.remove("volumes");
    restore_trailing_blank(app, marker);

    assert!(doc
        .serialize()
        .starts_with("services:\n  app:\n    image: gisquick/server\n\n  # Reverse proxy\n  caddy:\n"));
}

#[test]
fn snapshot_survives_reordering() {
    let mut doc = Document::load(SOURCE).unwrap();
    let services = doc.root_mut().mapping_mut("services").unwrap();
    let snapshot = TriviaSnapshot::capture_children(services);
    assert_eq!(snapshot.len(), 2);

    let app = services.mapping_mut("app").unwrap();
    app.sort_entries_by_key(|key| key != "volumes");
    let caddy = services.mapping_mut("caddy").unwrap();
    caddy.sort_entries_by_key(|key| key != "ports");
    snapshot.restore_children(services);

    assert_eq!(
        doc.serialize(),
        "\
services:
  app:
    volumes:
      - publish:/publish
    image: gisquick/server

  # Reverse proxy
  caddy:
    ports: []
    image: caddy:2

  redis:
    image: redis:7-alpine
"
    );
}

#[test]
fn blocks_without_a_separator_capture_nothing() {
    let mut doc = Document::load(SOURCE).unwrap();
    let services = doc.root_mut().mapping_mut("services").unwrap();
    let redis = services.mapping_mut("redis").unwrap();
    assert!(capture_trailing_blank(redis).is_none());
    assert_eq!(doc.serialize(), SOURCE);
}

#[test]
fn canonical_reorder_keeps_blank_lines_inside_a_service() {
    let source = "\
services:
  app:
    command: run

    image: x

  redis:
    image: redis
";
    let mut doc = Document::load(source).unwrap();
    let services = doc.root_mut().mapping_mut("services").unwrap();
    let snapshot = TriviaSnapshot::capture_children(services);
    canonicalize_service(services.mapping_mut("app").unwrap());
    snapshot.restore_children(services);

    let out = doc.serialize();
    assert_eq!(
        out,
        "services:\n  app:\n    image: x\n    command: run\n\n\n  redis:\n    image: redis\n"
    );
    assert_eq!(
        out.lines().filter(|line| line.trim().is_empty()).count(),
        source.lines().filter(|line| line.trim().is_empty()).count()
    );
}
