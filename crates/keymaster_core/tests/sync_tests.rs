use camino::{Utf8Path, Utf8PathBuf};
use keymaster_core::{
    generate_mapping, Error, MemoryFtp, RunConfig, StageOutcome, SyncPipeline, SyncStage,
    UrlSource,
};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn utf8(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
}

fn file_url(path: &Utf8Path) -> String {
    format!("file://{}", path)
}

fn write(path: Utf8PathBuf, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Lay out a key store, server config, PAR file and run config on disk.
fn hosted_files(root: &Utf8Path, extra: &str) -> String {
    write(root.join("keys/cba_a3.bikey"), "cba key");
    write(root.join("keys/ace.bikey"), "ace key");
    write(root.join("keys/server key.bikey"), "server key");
    write(
        root.join("mapping.json"),
        r#"{"@CBA_A3": ["cba_a3.bikey"], "@ace": ["ace.bikey"]}"#,
    );
    write(
        root.join("server.yml"),
        ":name: Integration\n:required_mods:\n- \"@CBA_A3\"\n:allowed_mods:\n- \"@ace\"\n:other:\n",
    );
    write(
        root.join("server.par"),
        "class Arg\r\n{\r\n\tmod=\"-mod=@old;\";\r\n};\r\n",
    );
    write(root.join("client_only.json"), r#"["@ace"]"#);

    let config = format!(
        r#"{{
            "keyLocation": "{keys}/",
            "keyMappingFile": "{mapping}",
            "ftpAddress": "ftp.example.com:2121",
            "ftpUser": "arma",
            "ftpPassword": "secret",
            "ftpPath": "/keys",
            "playWithSixServerConfigUrl": "{server}",
            "manualKeys": ["server key.bikey"]{extra}
        }}"#,
        keys = file_url(&root.join("keys")),
        mapping = file_url(&root.join("mapping.json")),
        server = file_url(&root.join("server.yml")),
        extra = extra,
    );
    write(root.join("config.json"), &config);
    file_url(&root.join("config.json"))
}

#[test]
fn test_full_sync_from_local_urls() {
    let hosted = TempDir::new().unwrap();
    let root = utf8(&hosted);
    let extra = format!(
        r#",
            "parFileSource": "{}",
            "parFileFtpPath": "/arma3/server.par",
            "parFileGenerateModParameter": true,
            "parFileClientOnlyModList": "{}""#,
        file_url(&root.join("server.par")),
        file_url(&root.join("client_only.json")),
    );
    let config_url = hosted_files(&root, &extra);

    let source = UrlSource::new().unwrap();
    let config = RunConfig::fetch(&source, &config_url).unwrap();

    let ftp = MemoryFtp::new()
        .with_credentials("arma", "secret")
        .with_file("/keys", "retired.bikey", "old")
        .with_file("/arma3", "server.par", "old par");
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let report = SyncPipeline::new(Box::new(source), Box::new(ftp.clone()))
        .with_staging_dir(root.join("staging"))
        .with_events(move |event| sink.lock().unwrap().push(event.clone()))
        .run(&config)
        .unwrap();

    assert_eq!(report.plan.server_name.as_deref(), Some("Integration"));
    assert_eq!(report.removed_files, vec!["retired.bikey"]);
    assert_eq!(
        ftp.files("/keys"),
        vec!["ace.bikey", "cba_a3.bikey", "server key.bikey"]
    );
    assert_eq!(ftp.file("/keys", "server key.bikey").unwrap(), b"server key");
    assert_eq!(
        std::fs::read_to_string(root.join("staging/ace.bikey")).unwrap(),
        "ace key"
    );

    let par = String::from_utf8(ftp.file("/arma3", "server.par").unwrap()).unwrap();
    assert_eq!(
        par,
        "class Arg\n\
         {\n\
         // Disabled by automated script. Using generated value.\n\
         //\tmod=\"-mod=@old;\";\n\
         // Generated command line:\n\
         \tmod=\"-mod=@cba_a3\";\n\
         };\n"
    );
    assert!(report.par_replaced);
    assert!(ftp.closed());
    assert_eq!(ftp.connections(), 1);

    let events = events.lock().unwrap();
    assert!(events
        .iter()
        .all(|event| event.outcome != StageOutcome::Failed));
    assert_eq!(events.last().unwrap().stage, SyncStage::Complete);
}

#[test]
fn test_unmapped_mod_leaves_server_untouched() {
    let hosted = TempDir::new().unwrap();
    let root = utf8(&hosted);
    let config_url = hosted_files(&root, r#", "manualMods": ["@UnknownMod"]"#);

    let source = UrlSource::new().unwrap();
    let config = RunConfig::fetch(&source, &config_url).unwrap();
    let ftp = MemoryFtp::new().with_file("/keys", "retired.bikey", "old");

    let err = SyncPipeline::new(Box::new(source), Box::new(ftp.clone()))
        .with_staging_dir(root.join("staging"))
        .run(&config)
        .unwrap_err();

    assert!(matches!(err, Error::UnmappedMods { ref mods } if mods == &["@unknownmod"]));
    assert_eq!(ftp.connections(), 0);
    assert_eq!(ftp.files("/keys"), vec!["retired.bikey"]);
    assert!(!root.join("staging").exists());
}

#[test]
fn test_dry_run_plan_needs_no_ftp() {
    let hosted = TempDir::new().unwrap();
    let root = utf8(&hosted);
    let config_url = hosted_files(&root, "");

    let source = UrlSource::new().unwrap();
    let config = RunConfig::fetch(&source, &config_url).unwrap();
    let ftp = MemoryFtp::new();

    let plan = SyncPipeline::new(Box::new(source), Box::new(ftp.clone()))
        .with_staging_dir(root.join("staging"))
        .plan(&config)
        .unwrap();

    assert_eq!(
        plan.keys.names().collect::<Vec<_>>(),
        vec!["ace.bikey", "cba_a3.bikey", "server key.bikey"]
    );
    assert_eq!(
        plan.keys.requesters("server key.bikey").unwrap().collect::<Vec<_>>(),
        vec!["Manual"]
    );
    assert_eq!(ftp.connections(), 0);
    assert!(!root.join("staging").exists());
}

#[test]
fn test_generated_mapping_drives_sync() {
    let mods = TempDir::new().unwrap();
    let mods_root = utf8(&mods);
    write(mods_root.join("@CBA_A3/keys/cba_a3.bikey"), "cba key");
    write(mods_root.join("@ace/key/ace.bikey"), "ace key");

    let hosted = TempDir::new().unwrap();
    let root = utf8(&hosted);
    let config_url = hosted_files(&root, "");
    // replace the hosted mapping with a generated one
    let generated = generate_mapping(&mods_root, &root.join("mapping.json"), true).unwrap();
    assert_eq!(generated.mods.len(), 2);
    assert!(root.join("ace.bikey").exists());

    let source = UrlSource::new().unwrap();
    let config = RunConfig::fetch(&source, &config_url).unwrap();
    let ftp = MemoryFtp::new().with_dir("/keys");

    SyncPipeline::new(Box::new(source), Box::new(ftp.clone()))
        .with_staging_dir(root.join("staging"))
        .run(&config)
        .unwrap();

    assert_eq!(
        ftp.files("/keys"),
        vec!["ace.bikey", "cba_a3.bikey", "server key.bikey"]
    );
}
