use gisquick_cli::core::compose::transform::{run_transforms, CanonicalKeyOrderTransform};
use gisquick_cli::core::compose::{
    canonicalize_service, ComposeContext, ComposeTransform, FileStage, SERVICE_KEY_ORDER,
};
use gisquick_cli::core::document::Document;
use url::Url;

#[test]
fn recognized_keys_follow_the_canonical_order() {
    let mut doc = Document::load(
        "svc:\n  command: run\n  logging: {}\n  ports: []\n  expose: []\n  env_file: []\n  environment: []\n  volumes: []\n  image: x\n  restart: always\n",
    )
    .unwrap();
    let service = doc.root_mut().mapping_mut("svc").unwrap();
    canonicalize_service(service);
    assert_eq!(service.keys().collect::<Vec<_>>(), SERVICE_KEY_ORDER.to_vec());
}

#[test]
fn comments_travel_with_their_keys() {
    let mut doc = Document::load(
        "svc:\n  command: run  # entry point\n  healthcheck: {}\n  image: gisquick/server\n  depends_on:\n    - redis\n",
    )
    .unwrap();
    let service = doc.root_mut().mapping_mut("svc").unwrap();
    canonicalize_service(service);
    assert_eq!(
        doc.serialize(),
        "svc:\n  healthcheck: {}\n  depends_on:\n    - redis\n  image: gisquick/server\n  command: run  # entry point\n"
    );
}

#[test]
fn canonicalizing_twice_changes_nothing() {
    let source = "svc:\n  volumes:\n    - ./a:/a\n  image: x\n  depends_on: [app]\n  restart: always\n";
    let mut doc = Document::load(source).unwrap();
    let service = doc.root_mut().mapping_mut("svc").unwrap();
    canonicalize_service(service);
    let once = doc.serialize();
    let service = doc.root_mut().mapping_mut("svc").unwrap();
    canonicalize_service(service);
    assert_eq!(doc.serialize(), once);
    assert_ne!(once, source);
}

#[test]
fn transform_orders_every_service() {
    let mut doc = Document::load(
        "services:\n  app:\n    command: serve\n    image: gisquick/server\n  placeholder:\n  redis:\n    ports: []\n    restart: always\nvolumes: {}\n",
    )
    .unwrap();
    let ctx = ComposeContext::new("out", "template", Url::parse("http://localhost").unwrap());
    let transforms: Vec<Box<dyn ComposeTransform>> = vec![Box::new(CanonicalKeyOrderTransform)];
    run_transforms(&mut doc, &ctx, &mut FileStage::new(), &transforms).unwrap();
    assert_eq!(
        doc.serialize(),
        "services:\n  app:\n    image: gisquick/server\n    command: serve\n  placeholder:\n  redis:\n    restart: always\n    ports: []\nvolumes: {}\n"
    );
}
