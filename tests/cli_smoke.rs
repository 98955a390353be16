use std::path::PathBuf;
use std::process::Command;

use padforge::render::fonts::FontCatalog;
use padforge::{FsStore, PadSize, Surface};

fn padforge_exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_padforge")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "padforge.exe"
            } else {
                "padforge"
            });
            p
        })
}

#[test]
fn cli_inspect_and_print_roundtrip() {
    let dir = PathBuf::from("target").join("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let assets_dir = dir.join("assets");
    let doc_path = dir.join("design.json");
    let out_path = dir.join("print.png");
    let _ = std::fs::remove_file(&out_path);

    let store = FsStore::open(&assets_dir).unwrap();
    let fonts = FontCatalog::new();
    let mut surface = Surface::new(PadSize::W80H30, None).unwrap();
    surface.set_rgb(true);
    let doc = surface.freeze(&store, &fonts).unwrap();
    std::fs::write(&doc_path, doc.to_json().unwrap()).unwrap();

    let exe = padforge_exe();
    let doc_arg = doc_path.to_string_lossy().to_string();
    let assets_arg = assets_dir.to_string_lossy().to_string();

    let inspect = Command::new(&exe)
        .args(["inspect", "--in", &doc_arg, "--assets", &assets_arg])
        .output()
        .expect("run padforge inspect");
    assert!(inspect.status.success(), "inspect failed: {inspect:?}");
    let stdout = String::from_utf8_lossy(&inspect.stdout);
    assert!(stdout.contains("80×30 cm"), "unexpected output: {stdout}");
    assert!(stdout.contains("250000"), "unexpected output: {stdout}");

    let print = Command::new(&exe)
        .args([
            "print",
            "--in",
            &doc_arg,
            "--assets",
            &assets_arg,
            "--out",
            &out_path.to_string_lossy(),
        ])
        .output()
        .expect("run padforge print");
    assert!(print.status.success(), "print failed: {print:?}");

    let png = std::fs::read(&out_path).unwrap();
    let decoded = image::load_from_memory(&png).unwrap();
    // 80x30 pads author at 960x360; the empty design prints at the floor multiplier.
    assert_eq!((decoded.width(), decoded.height()), (4800, 1800));
}
