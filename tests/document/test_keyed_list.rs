use gisquick_cli::core::document::{
    Document, EnvAssignment, KeyedEntry, KeyedList, Mapping, NameRef, PortMapping, Sequence,
    VolumeMount,
};
use gisquick_cli::core::ErrorCategory;

const SOURCE: &str = "\
services:
  app:
    volumes:
      - publish:/publish  # shared with qgisserver
      - ./data/media:/var/lib/gisquick/media
    environment:
      - GISQUICK_PROJECTS_ROOT=/publish
      - REDIS_ADDR=redis:6379
    depends_on:
      - redis
      - postgres
    expose:
      - \"3000\"
";

fn sequence<'a>(doc: &'a mut Document, key: &str) -> &'a mut Sequence {
    doc.get_mut(&["services", "app", key])
        .unwrap()
        .as_sequence_mut()
        .unwrap()
}

#[test]
fn edits_keep_order_and_comments() {
    let mut doc = Document::load(SOURCE).unwrap();
    KeyedList::<VolumeMount>::edit(sequence(&mut doc, "volumes"), |list| {
        assert!(list.replace("publish", VolumeMount::new("publish", "/publish:ro")));
        list.upsert([VolumeMount::parse("./src:/go/server")]);
        Ok(())
    })
    .unwrap();
    KeyedList::<EnvAssignment>::edit(sequence(&mut doc, "environment"), |list| {
        list.remove("REDIS_ADDR", true)?;
        list.upsert([
            EnvAssignment::parse("GISQUICK_PROJECTS_ROOT=/srv/publish"),
            EnvAssignment::parse("GISQUICK_SIGNUP_API=false"),
        ]);
        Ok(())
    })
    .unwrap();

    assert_eq!(
        doc.serialize(),
        "\
services:
  app:
    volumes:
      - publish:/publish:ro  # shared with qgisserver
      - ./data/media:/var/lib/gisquick/media
      - ./src:/go/server
    environment:
      - GISQUICK_PROJECTS_ROOT=/srv/publish
      - GISQUICK_SIGNUP_API=false
    depends_on:
      - redis
      - postgres
    expose:
      - \"3000\"
"
    );
}

#[test]
fn failed_edit_leaves_sequence_untouched() {
    let mut doc = Document::load(SOURCE).unwrap();
    let err = KeyedList::<EnvAssignment>::edit(sequence(&mut doc, "environment"), |list| {
        list.append(EnvAssignment::parse("EXTRA=1"));
        list.remove("GISQUICK_SQLITE_DB", true)?;
        Ok(())
    })
    .unwrap_err();
    assert_eq!(err.category, ErrorCategory::KeyNotFound);
    assert_eq!(doc.serialize(), SOURCE);
}

#[test]
fn name_refs_use_the_whole_value() {
    let mut doc = Document::load(SOURCE).unwrap();
    KeyedList::<NameRef>::edit(sequence(&mut doc, "depends_on"), |list| {
        assert!(list.get("post").is_none());
        list.remove("postgres", true)?;
        list.upsert([NameRef::new("redis")]);
        Ok(())
    })
    .unwrap();
    let deps = KeyedList::<NameRef>::from_sequence(sequence(&mut doc, "depends_on")).unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps.iter().next().map(NameRef::identity), Some("redis"));
}

#[test]
fn untouched_quoted_items_keep_their_quotes() {
    let mut doc = Document::load(SOURCE).unwrap();
    KeyedList::<NameRef>::edit(sequence(&mut doc, "expose"), |list| {
        list.upsert([NameRef::new("3000")]);
        Ok(())
    })
    .unwrap();
    assert_eq!(doc.serialize(), SOURCE);
}

#[test]
fn lookups_use_the_first_match() {
    let mut list = KeyedList::<EnvAssignment>::new();
    list.append(EnvAssignment::parse("A=1"));
    list.append(EnvAssignment::parse("A=2"));
    list.append(EnvAssignment::parse("standalone"));

    assert_eq!(list.get("A").map(EnvAssignment::payload), Some("1"));
    assert_eq!(list.index_of("standalone"), None);
    assert_eq!(list.index_of(""), Some(2));

    let removed = list.remove("A", true).unwrap().unwrap();
    assert_eq!(removed.encode(), "A=1");
    assert_eq!(list.get("A").map(EnvAssignment::payload), Some("2"));
    assert!(!list.replace("B", EnvAssignment::parse("B=1")));
    assert_eq!(list.len(), 2);
}

#[test]
fn new_entries_use_the_default_layout() {
    let mut sequence = Sequence::new();
    KeyedList::<PortMapping>::edit(&mut sequence, |list| {
        list.append(PortMapping::parse("80:80"));
        list.append(PortMapping::parse("443:443"));
        Ok(())
    })
    .unwrap();
    let mut root = Mapping::new();
    root.insert("ports", sequence);
    assert_eq!(
        Document::new(root).serialize(),
        "ports:\n  - 80:80\n  - 443:443\n"
    );
}
