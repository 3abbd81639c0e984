//! Export Integration Tests
//!
//! Full runs against an in-memory page tree, writing into a temp
//! directory. Asset downloads go to a local mock server.

mod common;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{child_page, page_id, paragraph, FakeNotion};
use notion_export::config::{ExportConfig, Overrides};
use notion_export::core::AssetDownloader;
use notion_export::domain::{Block, BlockKind, Media, Parent, RichText};
use notion_export::Exporter;

fn config(out: &Path, root: &str) -> ExportConfig {
    ExportConfig::resolve(
        Overrides {
            token: Some("secret_test".into()),
            root_page_id: Some(root.into()),
            out_dir: Some(out.to_path_buf()),
            concurrency: Some(2),
            ..Overrides::default()
        },
        None,
    )
}

fn exporter(api: FakeNotion, config: ExportConfig) -> Exporter {
    let downloader = AssetDownloader::with_client(reqwest::Client::new(), 4);
    Exporter::new(Arc::new(api), downloader, config)
}

fn image(id: &str, url: &str, caption: &str) -> Block {
    Block::new(
        id,
        BlockKind::Image(Media {
            file_url: Some(url.into()),
            caption: vec![RichText::plain(caption)],
            ..Media::default()
        }),
    )
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{}: {}", path.display(), e))
}

fn files_in(dir: PathBuf) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_single_root_page() {
    let temp = TempDir::new().unwrap();
    let root = page_id(1);
    let api = FakeNotion::new().page(
        &root,
        "A",
        Parent::Workspace,
        vec![paragraph("p1", "Hello")],
    );

    let summary = exporter(api, config(temp.path(), &root)).run().await.unwrap();

    // A root always owns a directory named after itself, children or not
    assert_eq!(read(temp.path().join("A/A.md")), "# A\n\nHello\n");
    assert_eq!(summary.pages_visited, 1);
    assert_eq!(summary.pages_written, 1);
    assert!(summary.is_clean());
}

#[tokio::test]
async fn test_one_level_of_nesting() {
    let temp = TempDir::new().unwrap();
    let (a, b) = (page_id(1), page_id(2));
    let api = FakeNotion::new()
        .page(&a, "A", Parent::Workspace, vec![child_page(&b, "B")])
        .page(&b, "B", Parent::Page(a.clone()), vec![paragraph("p1", "leaf")]);

    let summary = exporter(api, config(temp.path(), &a)).run().await.unwrap();

    assert_eq!(summary.pages_written, 2);
    assert_eq!(files_in(temp.path().join("A")), vec!["A.md", "B.md"]);
    assert!(read(temp.path().join("A/A.md")).contains('B'));
    assert_eq!(read(temp.path().join("A/B.md")), "# B\n\nleaf\n");
}

#[tokio::test]
async fn test_page_with_children_owns_directory() {
    let temp = TempDir::new().unwrap();
    let (a, b, c) = (page_id(1), page_id(2), page_id(3));
    let api = FakeNotion::new()
        .page(&a, "A", Parent::Workspace, vec![child_page(&b, "B")])
        .page(&b, "B", Parent::Page(a.clone()), vec![child_page(&c, "C")])
        .page(&c, "C: the end?", Parent::Page(b.clone()), vec![]);

    exporter(api, config(temp.path(), &a)).run().await.unwrap();

    assert!(temp.path().join("A/A.md").is_file());
    assert!(temp.path().join("A/B/B.md").is_file());
    assert!(temp.path().join("A/B/C the end.md").is_file());
}

#[tokio::test]
async fn test_existing_files_are_kept_without_force() {
    let temp = TempDir::new().unwrap();
    let root = page_id(1);
    let api = || {
        FakeNotion::new().page(&root, "A", Parent::Workspace, vec![paragraph("p1", "new")])
    };

    let target = temp.path().join("A/A.md");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();
    std::fs::write(&target, "keep me").unwrap();

    let summary = exporter(api(), config(temp.path(), &root)).run().await.unwrap();
    assert_eq!(read(target.clone()), "keep me");
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.pages_written, 0);

    let mut forced = config(temp.path(), &root);
    forced.force = true;
    let summary = exporter(api(), forced).run().await.unwrap();
    assert_eq!(read(target), "# A\n\nnew\n");
    assert_eq!(summary.pages_written, 1);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out");
    let (a, b) = (page_id(1), page_id(2));
    let api = FakeNotion::new()
        .page(&a, "A", Parent::Workspace, vec![child_page(&b, "B")])
        .page(&b, "B", Parent::Page(a.clone()), vec![]);

    let mut config = config(&out, &a);
    config.dry_run = true;
    let summary = exporter(api, config).run().await.unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.pages_written, 2);
    assert!(!out.exists());
}

#[tokio::test]
async fn test_failed_asset_does_not_fail_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/ok.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/gone.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let root = page_id(1);
    let api = FakeNotion::new().page(
        &root,
        "Gallery",
        Parent::Workspace,
        vec![
            image("i1", &format!("{}/files/ok.png", server.uri()), "first"),
            image("i2", &format!("{}/files/gone.png", server.uri()), "second"),
        ],
    );

    let summary = exporter(api, config(temp.path(), &root)).run().await.unwrap();

    let markdown = read(temp.path().join("Gallery/Gallery.md"));
    assert!(markdown.contains("![first](./media/first.png)"));
    assert!(markdown.contains("![second](./media/second.png)"));

    assert_eq!(files_in(temp.path().join("Gallery/media")), vec!["first.png"]);
    assert_eq!(
        std::fs::read(temp.path().join("Gallery/media/first.png")).unwrap(),
        b"PNGDATA"
    );
    assert_eq!(summary.assets_downloaded, 1);
    assert_eq!(summary.assets_failed, 1);
    assert!(summary.is_clean());
}

#[tokio::test]
async fn test_asset_names_never_collide() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"IMG".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let (root, left, right) = (page_id(1), page_id(2), page_id(3));
    let url = |n: &str| format!("{}/{}/diagram.png", server.uri(), n);
    let api = FakeNotion::new()
        .page(
            &root,
            "Root",
            Parent::Workspace,
            vec![
                image("r1", &url("a"), "diagram"),
                image("r2", &url("b"), "diagram"),
                child_page(&left, "Left"),
                child_page(&right, "Right"),
            ],
        )
        .page(&left, "Left", Parent::Page(root.clone()), vec![image("l1", &url("c"), "diagram")])
        .page(&right, "Right", Parent::Page(root.clone()), vec![image("x1", &url("d"), "diagram")]);

    let summary = exporter(api, config(temp.path(), &root)).run().await.unwrap();

    // Root and both leaf pages share Root/media
    assert_eq!(
        files_in(temp.path().join("Root/media")),
        vec!["diagram-2.png", "diagram.png", "left--diagram.png", "right--diagram.png"]
    );
    assert_eq!(summary.assets_downloaded, 4);

    assert!(read(temp.path().join("Root/Left.md")).contains("![diagram](./media/left--diagram.png)"));
    assert!(read(temp.path().join("Root/Right.md")).contains("![diagram](./media/right--diagram.png)"));

    let root_md = read(temp.path().join("Root/Root.md"));
    assert!(root_md.contains("![diagram](./media/diagram.png)"));
    assert!(root_md.contains("![diagram](./media/diagram-2.png)"));
}

#[tokio::test]
async fn test_same_titled_siblings_are_both_written() {
    let temp = TempDir::new().unwrap();
    let (a, b, c) = (page_id(1), page_id(2), page_id(3));
    let api = FakeNotion::new()
        .page(&a, "A", Parent::Workspace, vec![child_page(&b, "Notes"), child_page(&c, "Notes")])
        .page(&b, "Notes", Parent::Page(a.clone()), vec![paragraph("p1", "first sibling")])
        .page(&c, "Notes", Parent::Page(a.clone()), vec![paragraph("p2", "second sibling")]);

    let summary = exporter(api, config(temp.path(), &a)).run().await.unwrap();

    assert_eq!(files_in(temp.path().join("A")), vec!["A.md", "Notes-2.md", "Notes.md"]);
    assert_eq!(read(temp.path().join("A/Notes.md")), "# Notes\n\nfirst sibling\n");
    assert_eq!(read(temp.path().join("A/Notes-2.md")), "# Notes\n\nsecond sibling\n");
    assert_eq!(summary.pages_written, 3);
    assert_eq!(summary.pages_skipped, 0);
}

#[tokio::test]
async fn test_leaf_asset_names_are_stable_across_runs() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"IMG".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let root = page_id(1);
    let leaves: Vec<String> = (2..=7).map(page_id).collect();
    let api = || {
        let mut api = FakeNotion::new().page(
            &root,
            "Root",
            Parent::Workspace,
            leaves.iter().map(|id| child_page(id, "Chart")).collect(),
        );
        for (i, id) in leaves.iter().enumerate() {
            let url = format!("{}/{}/chart.png", server.uri(), i);
            api = api.page(id, "Chart", Parent::Page(root.clone()), vec![image("i", &url, "chart")]);
        }
        api
    };

    let mut forced = config(temp.path(), &root);
    forced.concurrency = 6;
    forced.force = true;

    exporter(api(), forced.clone()).run().await.unwrap();
    let first: Vec<String> = (0..6)
        .map(|i| {
            let name = if i == 0 { "Chart".to_string() } else { format!("Chart-{}", i + 1) };
            read(temp.path().join(format!("Root/{}.md", name)))
        })
        .collect();

    exporter(api(), forced).run().await.unwrap();
    for (i, before) in first.iter().enumerate() {
        let name = if i == 0 { "Chart".to_string() } else { format!("Chart-{}", i + 1) };
        assert_eq!(&read(temp.path().join(format!("Root/{}.md", name))), before);
    }
    assert!(first[1].contains("./media/chart-2--chart.png"));
    assert_eq!(files_in(temp.path().join("Root/media")).len(), 6);
}

#[tokio::test]
async fn test_failed_child_is_reported() {
    let temp = TempDir::new().unwrap();
    let (a, b, c) = (page_id(1), page_id(2), page_id(3));
    let api = FakeNotion::new()
        .page(&a, "A", Parent::Workspace, vec![child_page(&b, "B"), child_page(&c, "C")])
        .page(&b, "B", Parent::Page(a.clone()), vec![])
        .page(&c, "C", Parent::Page(a.clone()), vec![])
        .failing(&b);

    let summary = exporter(api, config(temp.path(), &a)).run().await.unwrap();

    assert_eq!(summary.pages_failed, 1);
    assert_eq!(summary.failures[0].page_id, b);
    assert!(temp.path().join("A/C.md").is_file());
    assert!(!temp.path().join("A/B.md").exists());
}
