//! Integration tests for the dslip binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use predicates::prelude::*;
use tempfile::TempDir;

/// CLI command isolated from the user's configuration directory.
fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_dslip"));
    cmd.env("XDG_CONFIG_HOME", home.path());
    cmd
}

/// Write a PDF with one page per entry, one text line per line of the entry.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in text.lines() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

struct Fixture {
    dir: TempDir,
    pdf: PathBuf,
    directory: PathBuf,
}

fn fixture(header: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let pdf = dir.path().join("polizze.pdf");
    write_pdf(
        &pdf,
        &["COMPAGNIA POL001\nCLIENTE ROSSI SRL", "NESSUN NUMERO\nCLIENTE BIANCHI"],
    );
    let directory = dir.path().join("produttori.csv");
    fs::write(
        &directory,
        format!("Elenco produttori,,\nAggiornato al,,\n{}\nPOL001,Acme & Co,ROSSI\n", header),
    )
    .unwrap();
    Fixture { dir, pdf, directory }
}

fn page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

#[test]
fn test_help_lists_commands() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("split"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_init_get_set() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("custom.json");
    let config_arg = config.to_str().unwrap();

    cli(&home)
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(config.exists());

    cli(&home)
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    cli(&home)
        .args(["--config", config_arg, "config", "get", "directory.identifier_column"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"NUMERO\""));

    cli(&home)
        .args(["--config", config_arg, "config", "set", "directory.skip_rows", "3"])
        .assert()
        .success();
    cli(&home)
        .args(["--config", config_arg, "config", "get", "directory.skip_rows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));

    cli(&home)
        .args(["--config", config_arg, "config", "get", "directory.nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_path_uses_config_home() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dslip"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_split_writes_producer_and_unmatched_files() {
    let fx = fixture("NUMERO,PRODUTTORE,CLIENTE");
    let out = fx.dir.path().join("out");
    let archive = fx.dir.path().join("dslip_output.zip");

    cli(&fx.dir)
        .arg("split")
        .arg(&fx.pdf)
        .arg("--directory")
        .arg(&fx.directory)
        .arg("--output-dir")
        .arg(&out)
        .arg("--zip")
        .arg(&archive)
        .arg("--summary")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Acme & Co"));

    assert_eq!(page_count(&out.join("dslip_Acme_E_Co.pdf")), 1);
    assert_eq!(page_count(&out.join("dslip_SENZA_PRODUTTORE.pdf")), 1);
    assert!(out.join("dslip_SENZA_PRODUTTORE_elenco.xlsx").exists());
    assert!(archive.exists());

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("producer,page_count,filename"));
    assert!(summary.contains("Acme & Co,1,dslip_Acme_E_Co.pdf"));
}

#[test]
fn test_split_with_manual_assignment() {
    let fx = fixture("NUMERO,PRODUTTORE,CLIENTE");
    let out = fx.dir.path().join("out");
    let assignments = fx.dir.path().join("assignments.json");
    fs::write(
        &assignments,
        r#"[{"document": "polizze.pdf", "page": 2, "producer": "Acme & Co"}]"#,
    )
    .unwrap();

    cli(&fx.dir)
        .arg("split")
        .arg(&fx.pdf)
        .arg("-d")
        .arg(&fx.directory)
        .arg("-a")
        .arg(&assignments)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .success();

    assert_eq!(page_count(&out.join("dslip_Acme_E_Co.pdf")), 2);
    assert!(!out.join("dslip_SENZA_PRODUTTORE.pdf").exists());
}

#[test]
fn test_split_fails_on_missing_column() {
    let fx = fixture("POLIZZA,PRODUTTORE,CLIENTE");
    let out = fx.dir.path().join("out");

    cli(&fx.dir)
        .arg("split")
        .arg(&fx.pdf)
        .arg("-d")
        .arg(&fx.directory)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("column 'NUMERO'"));

    assert!(!out.exists());
}

#[test]
fn test_split_rejects_same_file_name_twice() {
    let fx = fixture("NUMERO,PRODUTTORE,CLIENTE");
    let other = fx.dir.path().join("other");
    fs::create_dir(&other).unwrap();
    write_pdf(&other.join("polizze.pdf"), &["COMPAGNIA POL001"]);
    let out = fx.dir.path().join("out");

    cli(&fx.dir)
        .arg("split")
        .arg(&fx.pdf)
        .arg(other.join("polizze.pdf"))
        .arg("-d")
        .arg(&fx.directory)
        .arg("-o")
        .arg(&out)
        .arg("-q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate document name 'polizze.pdf'"));

    assert!(!out.exists());
}

#[test]
fn test_split_without_inputs_fails() {
    let fx = fixture("NUMERO,PRODUTTORE,CLIENTE");
    let missing = fx.dir.path().join("missing-*.pdf");

    cli(&fx.dir)
        .arg("split")
        .arg(&missing)
        .arg("-d")
        .arg(&fx.directory)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF files found"));
}

#[test]
fn test_preview_csv_and_template() {
    let fx = fixture("NUMERO,PRODUTTORE,CLIENTE");
    let template = fx.dir.path().join("template.json");

    cli(&fx.dir)
        .arg("preview")
        .arg(&fx.pdf)
        .arg("-d")
        .arg(&fx.directory)
        .args(["--format", "csv"])
        .arg("--write-template")
        .arg(&template)
        .assert()
        .success()
        .stdout(predicate::str::contains("document,page,identifier,customer,producer"))
        .stdout(predicate::str::contains("polizze.pdf,1,POL001,ROSSI SRL,Acme & Co"));

    let entries: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&template).unwrap()).unwrap();
    assert_eq!(
        entries,
        serde_json::json!([{"document": "polizze.pdf", "page": 2, "producer": ""}])
    );
}
