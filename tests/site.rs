use pilcrow::build::{build_site, Error};
use pilcrow::index::Error as IndexError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TEMPLATES: &[(&str, &str)] = &[
    ("_head.html", r#"{{define "head"}}<title>{{.head_title}}</title>{{end}}"#),
    (
        "entry.html",
        r#"{{template "head" .}}{{.content}}{{if .nextpost}}<a href="{{.nextpost.url}}">next</a>{{end}}"#,
    ),
    ("page.html", r#"{{template "head" .}}{{range .pages}}{{.title}};{{end}}"#),
    ("tag.html", r#"{{.name}}:{{range .entries}}{{.id}} {{end}}"#),
    ("archive_year.html", r#"{{.year}}:{{range .entries}}{{.id}} {{end}}"#),
];

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site(docs: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        &root.join("site.yml"),
        "site_title: Notes\ndomain: https://example.org\ndescription: A blog\n",
    );
    for (name, contents) in TEMPLATES {
        write(&root.join("templates").join(name), contents);
    }
    fs::create_dir_all(root.join("content")).unwrap();
    for (name, contents) in docs {
        write(&root.join("content").join(name), contents);
    }
    write(&root.join("files").join("style.css"), "body {}");
    write(&root.join("files").join(".hidden"), "secret");
    dir
}

fn read(dir: &TempDir, path: &str) -> String {
    fs::read_to_string(dir.path().join("deploy").join(path)).unwrap()
}

fn blog() -> TempDir {
    site(&[
        (
            "hello.md",
            "title: Hello\ndate: 2021-03-01\ntags: rust, meta\n\n\
             <summary>Greeting.</summary>\nHello [world](other.html).\n",
        ),
        ("posts/second.md", "title: Second\ndate: 2021-04-01\ntags: rust\n\nMore.\n"),
        ("about.md", "title: About\n\nAbout me.\n"),
    ])
}

#[test]
fn test_build_writes_every_page() {
    let dir = blog();
    let stats = build_site(dir.path(), false).unwrap();
    assert_eq!(6, stats.pages);
    assert_eq!(1, stats.files);
    assert_eq!(2, stats.feed_entries);

    let hello = read(&dir, "2021/hello.html");
    assert!(hello.starts_with("<title>Hello | Notes</title>"), "{}", hello);
    assert!(hello.contains(r#"<a href="other.html">world</a>"#), "{}", hello);
    assert!(!hello.contains("Greeting."), "{}", hello);
    assert!(hello.contains(r#"<a href="/2021/second.html">next</a>"#), "{}", hello);

    assert_eq!(
        "<title>About | Notes</title>Second;Hello;",
        read(&dir, "about.html")
    );
    assert_eq!("rust:2021/second 2021/hello", read(&dir, "rust.html"));
    assert_eq!("meta:2021/hello", read(&dir, "meta.html"));
    assert_eq!("2021:2021/hello 2021/second", read(&dir, "2021.html"));
}

#[test]
fn test_build_copies_static_files() {
    let dir = blog();
    build_site(dir.path(), false).unwrap();
    assert_eq!("body {}", read(&dir, "style.css"));
    assert!(!dir.path().join("deploy").join(".hidden").exists());
}

#[test]
fn test_build_writes_feed() {
    let dir = blog();
    build_site(dir.path(), false).unwrap();
    let feed = read(&dir, "feed.atom");
    assert!(feed.contains("https://example.org/2021/hello.html"), "{}", feed);
    assert!(feed.contains("https://example.org/2021/other.html"), "{}", feed);
    assert!(!feed.contains("About me"), "{}", feed);
    assert!(
        feed.find("https://example.org/2021/second.html").unwrap()
            < feed.find("https://example.org/2021/hello.html").unwrap(),
        "{}",
        feed
    );
}

#[test]
fn test_clean_removes_stale_output() {
    let dir = blog();
    write(&dir.path().join("deploy").join("stale.html"), "old");

    build_site(dir.path(), false).unwrap();
    assert!(dir.path().join("deploy").join("stale.html").exists());

    build_site(dir.path(), true).unwrap();
    assert!(!dir.path().join("deploy").join("stale.html").exists());
    assert!(dir.path().join("deploy").join("about.html").exists());
}

#[test]
fn test_duplicate_id_is_fatal() {
    let dir = site(&[("a.md", "title: One\n\nx"), ("drafts/a.md", "title: Two\n\ny")]);
    match build_site(dir.path(), false) {
        Err(Error::Index(IndexError::DuplicateId(id))) => assert_eq!("a", id),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_missing_templates_directory() {
    let dir = site(&[]);
    fs::remove_dir_all(dir.path().join("templates")).unwrap();
    match build_site(dir.path(), false) {
        Err(Error::MissingPath(path)) => assert!(path.ends_with("templates")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_missing_config() {
    let dir = site(&[]);
    fs::remove_file(dir.path().join("site.yml")).unwrap();
    assert!(matches!(
        build_site(dir.path(), false),
        Err(Error::Config(_))
    ));
}
