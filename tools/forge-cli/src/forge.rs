//! Forge command - build a launcher for one game

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use emuforge_core::{
    CancelToken, ForgeEngine, ForgeRequest, Platform, PluginChoice, TargetChoice,
};

/// Arguments for the forge command
#[derive(Args)]
pub struct ForgeArgs {
    /// Game name, used for the output file name
    #[arg(short, long)]
    pub name: String,

    /// Emulator executable
    #[arg(short, long)]
    pub emulator: PathBuf,

    /// ROM or disc image (.cue/.m3u playlists bring their tracks along)
    #[arg(short, long)]
    pub rom: PathBuf,

    /// BIOS image, for emulators that need one
    #[arg(short, long)]
    pub bios: Option<PathBuf>,

    /// Directory to write the launcher into
    #[arg(short, long)]
    pub output: PathBuf,

    /// Launch conventions to use: `auto` or a catalog id
    #[arg(long, default_value = "auto")]
    pub plugin: PluginChoice,

    /// Platform override; detected from the ROM when omitted
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Target OS: `auto`, `windows` or `linux`
    #[arg(long, default_value = "auto")]
    pub target: TargetChoice,

    /// Start the emulator fullscreen
    #[arg(long)]
    pub fullscreen: bool,

    /// Copy emulator, ROM and BIOS into a self-contained bundle
    #[arg(long)]
    pub portable: bool,

    /// Extra arguments passed to the emulator
    #[arg(last = true)]
    pub extra: Vec<String>,
}

impl ForgeArgs {
    fn into_request(self) -> ForgeRequest {
        let mut request = ForgeRequest::new(self.name, self.rom, self.emulator, self.output)
            .with_plugin(self.plugin)
            .with_target(self.target)
            .fullscreen(self.fullscreen)
            .portable(self.portable)
            .with_args(self.extra);
        request.bios_path = self.bios;
        request.platform = self.platform;
        request
    }
}

/// Execute the forge command
pub fn execute(args: ForgeArgs, engine: &ForgeEngine) -> Result<()> {
    let request = args.into_request();
    tracing::debug!("Forge request: {:?}", request);
    let artifact = engine.forge(&request, &CancelToken::new(), &mut |p| {
        println!("[{}] {}", p.stage, p.message)
    })?;
    println!("Launcher written to {}", artifact.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ForgeArgs,
    }

    #[test]
    fn test_parse_forge_args() {
        let cli = TestCli::parse_from([
            "emuforge",
            "--name",
            "Test Game",
            "--emulator",
            "/bin/ppsspp",
            "--rom",
            "/roms/test.iso",
            "--output",
            "/tmp/out",
            "--fullscreen",
            "--platform",
            "psp",
            "--",
            "--verbose",
        ]);
        let request = cli.args.into_request();

        assert_eq!(request.game_name, "Test Game");
        assert_eq!(request.plugin, PluginChoice::Auto);
        assert_eq!(request.target_os, TargetChoice::Auto);
        assert_eq!(request.platform, Some(Platform::Psp));
        assert!(request.fullscreen);
        assert!(!request.portable);
        assert_eq!(request.extra_args, vec!["--verbose".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_writes_launcher() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Arc;

        use emuforge_core::{
            Bundler, EmulatorCatalog, EmulatorManager, HttpFetcher, ManagerOptions, MemoryStore,
        };

        let dir = tempfile::tempdir().unwrap();
        let emulator = dir.path().join("ppsspp");
        std::fs::write(&emulator, b"\x7fELF\x02\x01\x01\x00").unwrap();
        std::fs::set_permissions(&emulator, std::fs::Permissions::from_mode(0o755)).unwrap();
        let rom = dir.path().join("test.iso");
        std::fs::write(&rom, b"rom").unwrap();
        let out = dir.path().join("out");

        let manager = EmulatorManager::new(
            EmulatorCatalog::builtin(),
            ManagerOptions::new(dir.path().join("emulators")),
            Box::new(MemoryStore::new()),
            Arc::new(HttpFetcher::default()),
        );
        let engine = ForgeEngine::new(manager, Bundler::new(dir.path().join("work"), None));

        let argv: Vec<std::ffi::OsString> = vec![
            "emuforge".into(),
            "--name".into(),
            "Test Game".into(),
            "--emulator".into(),
            emulator.into(),
            "--rom".into(),
            rom.into(),
            "--output".into(),
            out.clone().into(),
            "--fullscreen".into(),
        ];
        let cli = TestCli::parse_from(argv);
        execute(cli.args, &engine).unwrap();

        let script = std::fs::read_to_string(out.join("Test Game")).unwrap();
        assert!(script.contains("'--fullscreen'"), "{script}");
    }

    #[test]
    fn test_bad_platform_is_rejected() {
        let parsed = TestCli::try_parse_from([
            "emuforge",
            "--name",
            "G",
            "--emulator",
            "e",
            "--rom",
            "r",
            "--output",
            "o",
            "--platform",
            "atari",
        ]);
        assert!(parsed.is_err());
    }
}
