//! Builtin emulator table.
//!
//! Table order is fitness order: for each platform, the first emulator listed
//! is the recommended one.

use emuforge_shared::{Platform, TargetOs};

use super::profiles::{BiosHandling, FullscreenArgs, LaunchProfile};
use super::{ArchiveKind, DownloadSource, EmulatorDescriptor};

const fn win(url: &'static str, kind: ArchiveKind, binary: &'static str) -> DownloadSource {
    DownloadSource {
        os: TargetOs::Windows,
        url,
        kind,
        binary,
    }
}

const fn appimage(url: &'static str, binary: &'static str) -> DownloadSource {
    DownloadSource {
        os: TargetOs::Linux,
        url,
        kind: ArchiveKind::AppImage,
        binary,
    }
}

/// PCSX2 reads `$XDG_CONFIG_HOME/PCSX2/inis/PCSX2.ini`; folders are relative
/// to `$XDG_CONFIG_HOME/PCSX2`.
const PCSX2_INI: &str = "\
[UI]
SettingsVersion = 1
SetupWizardIncomplete = false
ConfirmShutdown = false
PauseOnFocusLoss = false

[Folders]
Bios = bios
Snapshots = snaps
Savestates = sstates
MemoryCards = memcards
Logs = logs

[AutoUpdater]
CheckAtStartup = false
";

/// DuckStation ignores XDG variables and keeps its data under
/// `$HOME/.local/share/duckstation`.
const DUCKSTATION_INI: &str = "\
[Main]
SettingsVersion = 3
SetupWizardIncomplete = false
ConfirmPowerOff = false
PauseOnFocusLoss = false

[BIOS]
SearchDirectory = bios

[UI]
ShowStartWizard = false
SetupWizardIncomplete = false

[AutoUpdater]
CheckAtStartup = false
";

pub static BUILTIN: &[EmulatorDescriptor] = &[
    EmulatorDescriptor {
        id: "ppsspp",
        display_name: "PPSSPP",
        platforms: &[Platform::Psp],
        sources: &[
            win(
                "https://github.com/hrydgard/ppsspp/releases/download/v1.17.1/PPSSPPWindows.zip",
                ArchiveKind::Zip,
                "PPSSPPWindows64.exe",
            ),
            appimage(
                "https://github.com/hrydgard/ppsspp/releases/download/v1.19.3/PPSSPP-v1.19.3-anylinux-x86_64.AppImage",
                "PPSSPP.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["ppsspp"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["--fullscreen"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "pcsx2",
        display_name: "PCSX2",
        platforms: &[Platform::Ps2],
        sources: &[
            win(
                "https://github.com/PCSX2/pcsx2/releases/download/v2.2.0/pcsx2-v2.2.0-windows-x64-Qt.7z",
                ArchiveKind::SevenZip,
                "pcsx2-qtx64.exe",
            ),
            appimage(
                "https://github.com/PCSX2/pcsx2/releases/download/v2.2.0/pcsx2-v2.2.0-linux-appimage-x64-Qt.AppImage",
                "PCSX2.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["pcsx2"],
            base_args: &["-batch", "-nogui"],
            fullscreen: FullscreenArgs::before(&["-fullscreen"]),
            rom_prefix: &[],
            bios: BiosHandling::Directory("pcsx2_data/PCSX2/bios"),
            portable_env: &[("XDG_CONFIG_HOME", "pcsx2_data")],
            config_files: &[("pcsx2_data/PCSX2/inis/PCSX2.ini", PCSX2_INI)],
        },
    },
    EmulatorDescriptor {
        id: "duckstation",
        display_name: "DuckStation",
        platforms: &[Platform::Ps1],
        sources: &[
            win(
                "https://github.com/stenzek/duckstation/releases/download/v0.1-10530/duckstation-windows-x64-release.zip",
                ArchiveKind::Zip,
                "duckstation-qt-x64-ReleaseLTCG.exe",
            ),
            appimage(
                "https://github.com/stenzek/duckstation/releases/download/v0.1-10530/DuckStation-x64.AppImage",
                "DuckStation.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["duckstation"],
            base_args: &["-batch"],
            fullscreen: FullscreenArgs::before(&["-fullscreen"]),
            rom_prefix: &["--"],
            bios: BiosHandling::Directory("duckstation_home/.local/share/duckstation/bios"),
            portable_env: &[("HOME", "duckstation_home")],
            config_files: &[(
                "duckstation_home/.local/share/duckstation/settings.ini",
                DUCKSTATION_INI,
            )],
        },
    },
    EmulatorDescriptor {
        id: "dolphin",
        display_name: "Dolphin",
        platforms: &[Platform::GameCube, Platform::Wii],
        sources: &[
            win(
                "https://dl.dolphin-emu.org/releases/202309/dolphin-master-5.0-19870-x64.7z",
                ArchiveKind::SevenZip,
                "Dolphin-x64/Dolphin.exe",
            ),
            appimage(
                "https://github.com/pkgforge-dev/Dolphin-emu-AppImage/releases/download/2512%402026-01-15_1768463428/Dolphin_Emulator-2512-anylinux.squashfs-x86_64.AppImage",
                "Dolphin.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["dolphin"],
            base_args: &["-b"],
            fullscreen: FullscreenArgs::before(&["-C", "Dolphin.Display.Fullscreen=True"]),
            rom_prefix: &["-e"],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "rpcs3",
        display_name: "RPCS3",
        platforms: &[Platform::Ps3],
        sources: &[
            win(
                "https://github.com/RPCS3/rpcs3-binaries-win/releases/download/build-eaebd3426e7050c35beb8f24952d6da4d6a75360/rpcs3-v0.0.39-18703-eaebd342_win64_msvc.7z",
                ArchiveKind::SevenZip,
                "rpcs3.exe",
            ),
            appimage(
                "https://github.com/RPCS3/rpcs3-binaries-linux/releases/download/build-eaebd3426e7050c35beb8f24952d6da4d6a75360/rpcs3-v0.0.39-18703-eaebd342_linux64.AppImage",
                "RPCS3.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["rpcs3"],
            base_args: &["--no-gui"],
            fullscreen: FullscreenArgs::before(&["--fullscreen"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "cemu",
        display_name: "Cemu",
        platforms: &[Platform::WiiU],
        sources: &[
            win(
                "https://github.com/cemu-project/Cemu/releases/download/v2.4/Cemu_2.4.zip",
                ArchiveKind::Zip,
                "Cemu_2.4/Cemu.exe",
            ),
            appimage(
                "https://github.com/cemu-project/Cemu/releases/download/v2.4/Cemu-2.4-x64.AppImage",
                "Cemu.AppImage",
            ),
        ],
        profile: LaunchProfile {
            binary_hints: &["cemu"],
            base_args: &[],
            fullscreen: FullscreenArgs::after(&["-f"]),
            rom_prefix: &["-g"],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "ryujinx",
        display_name: "Ryujinx",
        platforms: &[Platform::Switch],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["ryujinx"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["--fullscreen"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "xemu",
        display_name: "xemu",
        platforms: &[Platform::Xbox],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["xemu"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["-full-screen"]),
            rom_prefix: &["-dvd_path"],
            bios: BiosHandling::Flag("-bios"),
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "melonds",
        display_name: "melonDS",
        platforms: &[Platform::Nds],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["melonds"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["-f"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "azahar",
        display_name: "Azahar",
        platforms: &[Platform::N3ds],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["azahar", "citra"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["-f"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "lime3ds",
        display_name: "Lime3DS",
        platforms: &[Platform::N3ds],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["lime3ds"],
            base_args: &[],
            fullscreen: FullscreenArgs::before(&["-f"]),
            rom_prefix: &[],
            bios: BiosHandling::None,
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "flycast",
        display_name: "Flycast",
        platforms: &[Platform::Dreamcast],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["flycast"],
            base_args: &[],
            fullscreen: FullscreenArgs::NONE,
            rom_prefix: &[],
            bios: BiosHandling::Directory("data"),
            portable_env: &[],
            config_files: &[],
        },
    },
    EmulatorDescriptor {
        id: "redream",
        display_name: "redream",
        platforms: &[Platform::Dreamcast],
        sources: &[],
        profile: LaunchProfile {
            binary_hints: &["redream"],
            base_args: &[],
            fullscreen: FullscreenArgs::NONE,
            rom_prefix: &[],
            bios: BiosHandling::Directory(""),
            portable_env: &[],
            config_files: &[],
        },
    },
];
