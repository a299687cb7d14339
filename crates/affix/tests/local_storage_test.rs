//! Flush against the local filesystem driver.
//!
//! Run with: `cargo test -p affix --test local_storage_test`

mod helpers;

use std::sync::Arc;

use affix::{
    Attachment, AttachmentConfig, AttachmentHost, AttachmentOptions, AttachmentSubscriber,
    FieldRegistry, ImageConverter, LocalDriver, RawFile, RenamePolicy, ResizeSpec, VariantRef,
    VariantSpec,
};
use helpers::{create_test_png, Article};

#[tokio::test]
async fn test_flush_writes_original_and_variant_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let driver = Arc::new(
        LocalDriver::new(dir.path(), Some("http://localhost:8080/files".to_string()))
            .await
            .unwrap(),
    );
    let config = AttachmentConfig::builder("local")
        .driver("local", driver)
        .rename(RenamePolicy::Keep)
        .converter(Arc::new(ImageConverter))
        .variant(
            "small",
            VariantSpec {
                resize: Some(ResizeSpec {
                    width: Some(10),
                    height: Some(10),
                    ..ResizeSpec::default()
                }),
                ..VariantSpec::default()
            },
        )
        .build()
        .unwrap();

    let mut registry = FieldRegistry::new();
    registry.register(
        "Article",
        "cover",
        AttachmentOptions {
            folder: "articles/:slug".to_string(),
            variants: vec![VariantRef::Named("small".to_string())],
            ..AttachmentOptions::default()
        },
    );
    let subscriber = AttachmentSubscriber::new(Arc::new(config), registry);

    let mut article = Article::new("on-disk");
    article.cover = Some(Attachment::from_raw_file(RawFile::from_bytes(
        "banner.png",
        "image/png",
        create_test_png(40, 40),
    )));

    let mut entities: Vec<&mut dyn AttachmentHost> = vec![&mut article];
    subscriber.before_flush(&mut entities).await.unwrap();

    let cover = article.cover.as_ref().unwrap();
    let record = cover.serialize().unwrap();
    assert_eq!(record.path, "articles/on-disk/banner/banner.png");
    assert!(dir.path().join("articles/on-disk/banner/banner.png").is_file());
    assert!(dir
        .path()
        .join("articles/on-disk/banner/banner.small.webp")
        .is_file());
    assert_eq!(
        record.url.as_deref(),
        Some("http://localhost:8080/files/articles/on-disk/banner/banner.png")
    );

    // bytes accessor reads back exactly what was stored
    let stored = cover.bytes(None).await.unwrap();
    assert_eq!(stored.as_ref(), create_test_png(40, 40).as_slice());
}

#[tokio::test]
async fn test_flush_from_path_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("upload.png");
    tokio::fs::write(&source, create_test_png(20, 20))
        .await
        .unwrap();

    let store = tempfile::tempdir().unwrap();
    let driver = Arc::new(LocalDriver::new(store.path(), None).await.unwrap());
    let config = AttachmentConfig::builder("local")
        .driver("local", driver)
        .rename(RenamePolicy::Keep)
        .build()
        .unwrap();
    let subscriber = AttachmentSubscriber::new(Arc::new(config), FieldRegistry::new());

    let mut article = Article::new("from-disk");
    article.cover = Some(Attachment::from_raw_file(RawFile::from_path(
        "upload.png",
        "image/png",
        &source,
    )));

    let mut entities: Vec<&mut dyn AttachmentHost> = vec![&mut article];
    subscriber.before_flush(&mut entities).await.unwrap();

    let record = article.cover.as_ref().unwrap().serialize().unwrap();
    assert_eq!(record.path, "attachments/upload/upload.png");
    assert_eq!(record.size, create_test_png(20, 20).len() as u64);
    assert!(store.path().join("attachments/upload/upload.png").is_file());
}
