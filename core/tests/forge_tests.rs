//! End-to-end forge tests against real files in a temporary directory.

#![cfg(unix)]

mod common;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;

use common::{
    StaticFetcher, dir_names, fake_emulator, manager_with, offline_engine, write_file, zip_bytes,
};
use emuforge_core::{
    Bundler, CancelToken, ForgeEngine, ForgeError, ForgeProgress, ForgeRequest, ForgeStage,
    InputField, Platform, PluginChoice, TargetOs,
};
use emuforge_shared::LaunchManifest;

fn forge(
    engine: &ForgeEngine,
    request: &ForgeRequest,
) -> (Result<PathBuf, ForgeError>, Vec<ForgeProgress>) {
    let mut events = Vec::new();
    let result = engine.forge(request, &CancelToken::new(), &mut |p| events.push(p));
    (result, events)
}

#[test]
fn test_script_launcher_invokes_emulator_with_fullscreen_flag() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("roms/test.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Test Game", &rom, &emulator, &out).fullscreen(true);
    let (result, events) = forge(&engine, &request);
    let artifact = result.unwrap();

    assert_eq!(artifact, out.join("Test Game"));
    let text = fs::read_to_string(&artifact).unwrap();
    let expected = format!(
        "exec '{}' '--fullscreen' '{}' \"$@\"",
        emulator.display(),
        rom.display()
    );
    assert!(text.contains(&expected), "{text}");

    use std::os::unix::fs::PermissionsExt;
    let mode = fs::metadata(&artifact).unwrap().permissions().mode();
    assert_eq!(mode & 0o111, 0o111);

    assert_eq!(events.first().map(|e| e.stage), Some(ForgeStage::DetectingPlatform));
    assert_eq!(events.last().map(|e| e.stage), Some(ForgeStage::Done));
    assert!(events.windows(2).all(|w| w[0].stage <= w[1].stage));
}

#[test]
fn test_missing_rom_creates_nothing() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Test Game", dir.path().join("missing.iso"), &emulator, &out);
    let (result, _) = forge(&engine, &request);

    assert!(matches!(
        result,
        Err(ForgeError::InvalidInput {
            field: InputField::RomPath,
            ..
        })
    ));
    assert!(!out.exists());
}

#[test]
fn test_blank_name_is_rejected_first() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());

    let request = ForgeRequest::new("   ", "/nope.iso", "/nope", dir.path().join("out"));
    let (result, _) = forge(&engine, &request);

    assert!(matches!(
        result,
        Err(ForgeError::InvalidInput {
            field: InputField::GameName,
            ..
        })
    ));
}

#[test]
fn test_non_executable_emulator_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let rom = write_file(&dir.path().join("game.iso"), b"rom");
    let emulator = write_file(&dir.path().join("emu"), b"just text");

    let request = ForgeRequest::new("Game", &rom, &emulator, dir.path().join("out"));
    let (result, _) = forge(&engine, &request);

    assert!(matches!(
        result,
        Err(ForgeError::InvalidInput {
            field: InputField::EmulatorPath,
            ..
        })
    ));
}

#[test]
fn test_unknown_plugin_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "emu");
    let rom = write_file(&dir.path().join("game.iso"), b"rom");

    let request = ForgeRequest::new("Game", &rom, &emulator, dir.path().join("out"))
        .with_plugin(PluginChoice::Emulator("mame".into()));
    let (result, _) = forge(&engine, &request);

    assert!(matches!(
        result,
        Err(ForgeError::InvalidInput {
            field: InputField::Plugin,
            ..
        })
    ));
}

#[test]
fn test_existing_artifact_is_overwritten() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");
    write_file(&out.join("Test Game"), b"stale launcher");

    let request = ForgeRequest::new("Test Game", &rom, &emulator, &out);
    let artifact = forge(&engine, &request).0.unwrap();

    let text = fs::read_to_string(&artifact).unwrap();
    assert!(text.starts_with("#!/bin/sh\n"));
    assert_eq!(dir_names(&out), vec!["Test Game"]);
}

#[test]
fn test_windows_target_writes_cmd_script() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Test: Game", &rom, &emulator, &out)
        .with_target(emuforge_core::TargetChoice::Os(TargetOs::Windows));
    let artifact = forge(&engine, &request).0.unwrap();

    assert_eq!(artifact, out.join("Test Game.cmd"));
    let text = fs::read_to_string(&artifact).unwrap();
    assert!(text.starts_with("@echo off\r\n"));
    assert!(text.trim_end().ends_with("%*"));
}

#[test]
fn test_windows_device_name_keeps_suffix_on_the_stem() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("CON.v2", &rom, &emulator, &out)
        .with_target(emuforge_core::TargetChoice::Os(TargetOs::Windows));
    let artifact = forge(&engine, &request).0.unwrap();

    assert_eq!(artifact, out.join("CON_.v2.cmd"));
}

#[test]
fn test_portable_zip_is_relocatable() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("roms/test.iso"), b"rom image");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Test Game", &rom, &emulator, &out)
        .fullscreen(true)
        .portable(true);
    let artifact = forge(&engine, &request).0.unwrap();
    assert_eq!(artifact, out.join("Test Game.zip"));

    for place in ["first", "second/nested"] {
        let target = dir.path().join(place);
        fs::create_dir_all(&target).unwrap();
        zip::ZipArchive::new(File::open(&artifact).unwrap())
            .unwrap()
            .extract(&target)
            .unwrap();

        let root = target.join("Test Game");
        let manifest =
            LaunchManifest::from_json(&fs::read(root.join(LaunchManifest::FILE_NAME)).unwrap())
                .unwrap();
        assert_eq!(manifest.platform, Platform::Psp);
        assert_eq!(manifest.emulator_id.as_deref(), Some("ppsspp"));

        let launch = manifest.resolve(&root).unwrap();
        assert!(launch.program.starts_with(&root));
        assert!(launch.program.is_file());
        let rom_arg = Path::new(&launch.args[1]);
        assert!(rom_arg.starts_with(&root));
        assert_eq!(fs::read(rom_arg).unwrap(), b"rom image");

        let script = fs::read_to_string(root.join("launch.sh")).unwrap();
        assert!(script.contains("HERE="));
        assert!(!script.contains(&dir.path().display().to_string()));
    }
}

#[test]
fn test_portable_bundle_carries_cue_tracks() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "duckstation-qt");
    let roms = dir.path().join("roms");
    write_file(&roms.join("game.bin"), b"track one");
    let cue = write_file(&roms.join("game.cue"), b"FILE \"game.bin\" BINARY\n  TRACK 01 MODE2/2352\n");
    let bios = write_file(&dir.path().join("scph1001.bin"), b"bios");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Disc Game", &cue, &emulator, &out)
        .with_bios(&bios)
        .portable(true);
    let artifact = forge(&engine, &request).0.unwrap();

    let archive = zip::ZipArchive::new(File::open(&artifact).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"Disc Game/rom/game.cue"));
    assert!(names.contains(&"Disc Game/rom/game.bin"));
    assert!(names.contains(
        &"Disc Game/emulator/duckstation_home/.local/share/duckstation/bios/scph1001.bin"
    ));
    assert!(names.contains(&"Disc Game/launch.json"));
}

#[test]
fn test_portable_bundle_seeds_emulator_settings() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "duckstation-qt");
    let rom = write_file(&dir.path().join("game.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Ps1 Game", &rom, &emulator, &out)
        .with_platform(Platform::Ps1)
        .portable(true);
    let artifact = forge(&engine, &request).0.unwrap();

    let extracted = dir.path().join("extracted");
    zip::ZipArchive::new(File::open(&artifact).unwrap())
        .unwrap()
        .extract(&extracted)
        .unwrap();
    let root = extracted.join("Ps1 Game");
    let settings = fs::read_to_string(
        root.join("emulator/duckstation_home/.local/share/duckstation/settings.ini"),
    )
    .unwrap();
    assert!(settings.contains("SetupWizardIncomplete = false"));

    let manifest =
        LaunchManifest::from_json(&fs::read(root.join(LaunchManifest::FILE_NAME)).unwrap()).unwrap();
    let launch = manifest.resolve(&root).unwrap();
    let home = launch
        .env
        .iter()
        .find(|(key, _)| key == "HOME")
        .map(|(_, value)| PathBuf::from(value))
        .unwrap();
    assert_eq!(home, root.join("emulator").join("duckstation_home"));
}

#[test]
fn test_portable_bundle_copies_managed_install() {
    let dir = tempdir().unwrap();
    let body = zip_bytes(&[
        ("PPSSPPWindows64.exe", "MZ ppsspp"),
        ("assets/font.zim", "font"),
    ]);
    let manager = manager_with(dir.path(), TargetOs::Windows, Arc::new(StaticFetcher::new(body)));
    let binary = manager.install("ppsspp", &CancelToken::new(), &mut |_| {}).unwrap();
    // The install is a Windows build; stand in a native binary at the same path.
    fs::write(&binary, b"\x7fELF\x02\x01\x01\x00").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
    }
    let engine = ForgeEngine::new(manager, Bundler::new(dir.path().join("work"), None));
    let rom = write_file(&dir.path().join("game.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Psp Game", &rom, &binary, &out).portable(true);
    let artifact = forge(&engine, &request).0.unwrap();

    let archive = zip::ZipArchive::new(File::open(&artifact).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"Psp Game/emulator/PPSSPPWindows64.exe"));
    assert!(names.contains(&"Psp Game/emulator/assets/font.zim"));
}

#[test]
fn test_script_for_managed_install_exports_profile_environment() {
    let dir = tempdir().unwrap();
    let fetcher = Arc::new(StaticFetcher::new(b"\x7fELF\x02\x01\x01appimage".to_vec()));
    let manager = manager_with(dir.path(), TargetOs::Linux, fetcher);
    let binary = manager.install("pcsx2", &CancelToken::new(), &mut |_| {}).unwrap();
    let engine = ForgeEngine::new(manager, Bundler::new(dir.path().join("work"), None));
    let rom = write_file(&dir.path().join("game.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Ps2 Game", &rom, &binary, &out);
    let artifact = forge(&engine, &request).0.unwrap();

    let data = dir.path().join("emulators/pcsx2/pcsx2_data");
    let text = fs::read_to_string(&artifact).unwrap();
    assert!(
        text.contains(&format!("export XDG_CONFIG_HOME='{}'", data.display())),
        "{text}"
    );
    assert!(data.join("PCSX2/inis/PCSX2.ini").is_file());
}

#[test]
fn test_portable_for_foreign_os_is_rejected() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Game", &rom, &emulator, &out)
        .with_target(emuforge_core::TargetChoice::Os(TargetOs::Windows))
        .portable(true);
    let (result, _) = forge(&engine, &request);

    assert!(matches!(
        result,
        Err(ForgeError::InvalidInput {
            field: InputField::TargetOs,
            ..
        })
    ));
    assert!(dir_names(&out).is_empty());
}

#[test]
fn test_self_extracting_bundle_carries_payload_trailer() {
    let dir = tempdir().unwrap();
    let manager = manager_with(
        dir.path(),
        TargetOs::host(),
        Arc::new(StaticFetcher::new(Vec::new())),
    );
    let stub = write_file(&dir.path().join("stub"), b"\x7fELF stub bytes");
    let engine = ForgeEngine::new(
        manager,
        Bundler::new(dir.path().join("work"), Some(stub.clone())),
    );
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Game", &rom, &emulator, &out).portable(true);
    let artifact = forge(&engine, &request).0.unwrap();
    assert_eq!(artifact, out.join("Game"));

    let mut file = File::open(&artifact).unwrap();
    let (trailer, offset) = emuforge_shared::PayloadTrailer::read_from(&mut file)
        .unwrap()
        .expect("payload trailer");
    assert_eq!(offset, fs::metadata(&stub).unwrap().len());
    assert!(trailer.archive_len > 0);
    assert!(fs::read(&artifact).unwrap().starts_with(b"\x7fELF stub bytes"));
}

#[test]
fn test_platform_override_skips_detection() {
    let dir = tempdir().unwrap();
    let engine = offline_engine(dir.path());
    let emulator = fake_emulator(&dir.path().join("bin"), "emu");
    let rom = write_file(&dir.path().join("game.bin"), b"no magic here");
    let out = dir.path().join("out");

    let request = ForgeRequest::new("Game", &rom, &emulator, &out)
        .with_platform(Platform::Dreamcast)
        .portable(true);
    let artifact = forge(&engine, &request).0.unwrap();

    let mut archive = zip::ZipArchive::new(File::open(&artifact).unwrap()).unwrap();
    let mut json = Vec::new();
    std::io::Read::read_to_end(&mut archive.by_name("Game/launch.json").unwrap(), &mut json)
        .unwrap();
    assert_eq!(LaunchManifest::from_json(&json).unwrap().platform, Platform::Dreamcast);
}

#[test]
fn test_cancelled_forge_leaves_output_untouched() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(offline_engine(dir.path()));
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");
    fs::create_dir_all(&out).unwrap();

    let request = ForgeRequest::new("Game", &rom, &emulator, &out).portable(true);
    let cancel = CancelToken::new();
    let mut token = Some(cancel.clone());
    let result = engine.forge(&request, &cancel, &mut |p| {
        if p.stage == ForgeStage::Staging
            && let Some(t) = token.take()
        {
            t.cancel();
        }
    });

    assert_eq!(result.unwrap_err(), ForgeError::Cancelled);
    assert!(dir_names(&out).is_empty());
}

#[test]
fn test_spawned_forge_reports_busy_to_second_caller() {
    let dir = tempdir().unwrap();
    let engine = Arc::new(offline_engine(dir.path()));
    let emulator = fake_emulator(&dir.path().join("bin"), "ppsspp");
    let rom = write_file(&dir.path().join("test.iso"), b"rom");
    let out = dir.path().join("out");
    let request = ForgeRequest::new("Game", &rom, &emulator, &out);

    let task = engine.spawn_forge(request.clone()).unwrap();
    let second = engine.spawn_forge(request.clone());
    let first = task.wait(|_| {});

    // The first task may already have finished; if not, the second must be Busy.
    match second {
        Err(err) => assert_eq!(err, ForgeError::Busy),
        Ok(task) => {
            task.join().unwrap();
        }
    }
    assert_eq!(first.unwrap(), out.join("Game"));

    // Once idle, forging works again.
    let again = engine.spawn_forge(request).unwrap().join().unwrap();
    assert_eq!(again, out.join("Game"));
}
