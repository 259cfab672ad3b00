//! Portable bundles: a relocatable directory tree, zipped, optionally
//! appended to the self-extracting launcher stub.
//!
//! Layout of the tree (and of the archive, under a `<name>/` root):
//!
//! ```text
//! launch.sh | launch.cmd   launcher script, paths relative to itself
//! launch.json              LaunchManifest for the self-extracting stub
//! emulator/                the managed install, or the single binary
//! rom/                     the ROM plus referenced tracks
//! bios/                    BIOS, for emulators taking it as a flag
//! ```
//!
//! Seed configuration files of the emulator's profile are written under
//! `emulator/` unless the staged install already carries them.

use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use emuforge_shared::{
    LaunchManifest, MANIFEST_VERSION, ManifestArg, PayloadTrailer, Platform, TargetOs,
};

use super::ResolvedEmulator;
use super::args::{LaunchArg, ResolvedArgs};
use super::companions::companion_files;
use super::script::{Script, Word};
use crate::cancel::CancelToken;
use crate::error::{ForgeError, ForgeResult, IoContext};
use crate::forge::ForgeRequest;

pub const EMULATOR_DIR: &str = "emulator";
pub const ROM_DIR: &str = "rom";
pub const BIOS_DIR: &str = "bios";

/// Everything needed to lay out one bundle.
pub struct PortableJob<'a> {
    pub name: &'a str,
    pub request: &'a ForgeRequest,
    pub platform: Platform,
    pub emulator: &'a ResolvedEmulator,
    pub args: &'a ResolvedArgs,
    pub target: TargetOs,
}

/// `/`-joined form of a relative path.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn join_slash(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| p.split('/'))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name_of(path: &Path, what: &str) -> ForgeResult<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ForgeError::io(format!("staging {what}"), "path has no file name"))
}

fn copy_file(from: &Path, to: &Path) -> ForgeResult<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).io_context(|| format!("creating {}", parent.display()))?;
    }
    fs::copy(from, to).io_context(|| format!("copying {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path, cancel: &CancelToken) -> ForgeResult<()> {
    for entry in WalkDir::new(from).follow_links(true) {
        cancel.checkpoint()?;
        let entry = entry.map_err(|e| ForgeError::io(format!("reading {}", from.display()), e))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| ForgeError::io("staging emulator", e))?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).io_context(|| format!("creating {}", target.display()))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy the emulator; returns the program path relative to the bundle root.
fn stage_emulator(job: &PortableJob<'_>, root: &Path, cancel: &CancelToken) -> ForgeResult<String> {
    let emulator_path = &job.request.emulator_path;
    let dest = root.join(EMULATOR_DIR);

    if let Some(record) = &job.emulator.install {
        let binary = fs::canonicalize(emulator_path).unwrap_or_else(|_| emulator_path.clone());
        let install_dir =
            fs::canonicalize(&record.install_dir).unwrap_or_else(|_| record.install_dir.clone());
        if let Ok(relative) = binary.strip_prefix(&install_dir) {
            debug!("Staging managed install {}", install_dir.display());
            copy_tree(&install_dir, &dest, cancel)?;
            return Ok(join_slash(&[EMULATOR_DIR, &slash_path(relative)]));
        }
    }

    let name = file_name_of(emulator_path, "emulator")?;
    copy_file(emulator_path, &dest.join(&name))?;
    Ok(join_slash(&[EMULATOR_DIR, &name]))
}

/// Copy the ROM and its companions; returns the ROM path relative to the root.
fn stage_rom(job: &PortableJob<'_>, root: &Path, cancel: &CancelToken) -> ForgeResult<String> {
    let rom = &job.request.rom_path;
    let rom_dir = root.join(ROM_DIR);
    let name = file_name_of(rom, "ROM")?;
    copy_file(rom, &rom_dir.join(&name))?;

    let base = rom.parent().unwrap_or(Path::new(""));
    for companion in companion_files(rom) {
        cancel.checkpoint()?;
        copy_file(&base.join(&companion), &rom_dir.join(&companion))?;
    }
    Ok(join_slash(&[ROM_DIR, &name]))
}

/// Place the BIOS where the emulator expects it; returns its relative path.
fn stage_bios(job: &PortableJob<'_>, root: &Path) -> ForgeResult<Option<String>> {
    let Some(bios) = &job.request.bios_path else {
        return Ok(None);
    };
    let name = file_name_of(bios, "BIOS")?;
    let relative = match job.args.bios_dir {
        Some(dir) => join_slash(&[EMULATOR_DIR, dir, &name]),
        None if job.args.args.contains(&LaunchArg::Bios) => join_slash(&[BIOS_DIR, &name]),
        None => return Ok(None),
    };
    let dest = emuforge_shared::join_relative(root, &relative)
        .map_err(|e| ForgeError::io("staging BIOS", e))?;
    copy_file(bios, &dest)?;
    Ok(Some(relative))
}

/// Lay out the bundle tree under `staging/<name>` and return its path.
pub fn stage(job: &PortableJob<'_>, staging: &Path, cancel: &CancelToken) -> ForgeResult<PathBuf> {
    let root = staging.join(job.name);
    fs::create_dir_all(&root).io_context(|| format!("creating {}", root.display()))?;

    let program = stage_emulator(job, &root, cancel)?;
    cancel.checkpoint()?;
    let rom = stage_rom(job, &root, cancel)?;
    cancel.checkpoint()?;
    let bios = stage_bios(job, &root)?;

    job.emulator
        .profile
        .write_config_files(&root.join(EMULATOR_DIR))?;

    let mut env = Vec::new();
    for (key, dir) in job.emulator.profile.portable_env {
        let relative = join_slash(&[EMULATOR_DIR, dir]);
        let path = emuforge_shared::join_relative(&root, &relative)
            .map_err(|e| ForgeError::io("staging environment", e))?;
        fs::create_dir_all(&path).io_context(|| format!("creating {}", path.display()))?;
        env.push(((*key).to_string(), relative));
    }

    let to_relative = |arg: &LaunchArg| -> Option<String> {
        match arg {
            LaunchArg::Literal(s) => Some(s.clone()),
            LaunchArg::Rom => Some(rom.clone()),
            LaunchArg::Bios => bios.clone(),
        }
    };

    let manifest = LaunchManifest {
        format_version: MANIFEST_VERSION,
        game_name: job.request.game_name.trim().to_string(),
        platform: job.platform,
        emulator_id: job.emulator.descriptor.map(|d| d.id.to_string()),
        target_os: job.target,
        emulator: program.clone(),
        args: job
            .args
            .args
            .iter()
            .filter_map(|arg| {
                let value = to_relative(arg)?;
                Some(match arg {
                    LaunchArg::Literal(_) => ManifestArg::Literal(value),
                    LaunchArg::Rom | LaunchArg::Bios => ManifestArg::Path(value),
                })
            })
            .collect(),
        env: env
            .iter()
            .map(|(k, v)| (k.clone(), ManifestArg::Path(v.clone())))
            .collect(),
    };
    let json = manifest
        .to_json()
        .map_err(|e| ForgeError::io("writing launch manifest", e))?;
    fs::write(root.join(LaunchManifest::FILE_NAME), json)
        .io_context(|| "writing launch manifest".to_string())?;

    let script = Script {
        program: Word::Relative(program),
        args: manifest
            .args
            .iter()
            .map(|arg| match arg {
                ManifestArg::Literal(s) => Word::Literal(s.clone()),
                ManifestArg::Path(p) => Word::Relative(p.clone()),
            })
            .collect(),
        env: env
            .into_iter()
            .map(|(k, v)| (k, Word::Relative(v)))
            .collect(),
    };
    let script_name = match job.target {
        TargetOs::Windows => "launch.cmd",
        TargetOs::Linux => "launch.sh",
    };
    let script_path = root.join(script_name);
    fs::write(&script_path, script.render(job.target, &manifest.game_name))
        .io_context(|| format!("writing {}", script_path.display()))?;
    set_executable(&script_path)?;

    Ok(root)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> ForgeResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .io_context(|| format!("marking {} executable", path.display()))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> ForgeResult<()> {
    Ok(())
}

#[cfg(unix)]
fn entry_mode(path: &Path, _relative: &str) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    match fs::metadata(path) {
        Ok(m) if m.permissions().mode() & 0o111 != 0 => 0o755,
        _ => 0o644,
    }
}

#[cfg(not(unix))]
fn entry_mode(_path: &Path, relative: &str) -> u32 {
    if relative.starts_with(EMULATOR_DIR) || relative.ends_with("launch.sh") {
        0o755
    } else {
        0o644
    }
}

/// Zip the bundle tree under a `<root name>/` prefix.
///
/// ROM and BIOS images are stored uncompressed: they are large and rarely
/// compress well.
pub fn package_zip<W: Write + Seek>(bundle: &Path, out: W, cancel: &CancelToken) -> ForgeResult<()> {
    let root_name = file_name_of(bundle, "bundle")?;
    let mut zip = zip::ZipWriter::new(out);
    let zip_err = |e: zip::result::ZipError| ForgeError::io("writing zip archive", e);

    for entry in WalkDir::new(bundle).sort_by_file_name() {
        cancel.checkpoint()?;
        let entry = entry.map_err(|e| ForgeError::io(format!("reading {}", bundle.display()), e))?;
        let relative = entry
            .path()
            .strip_prefix(bundle)
            .map(slash_path)
            .map_err(|e| ForgeError::io("packaging bundle", e))?;
        if relative.is_empty() {
            continue;
        }
        let name = format!("{root_name}/{relative}");

        if entry.file_type().is_dir() {
            zip.add_directory(name, SimpleFileOptions::default().unix_permissions(0o755))
                .map_err(zip_err)?;
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let is_image = relative.starts_with(&format!("{ROM_DIR}/"))
            || relative.starts_with(&format!("{BIOS_DIR}/"));
        let options = SimpleFileOptions::default()
            .compression_method(if is_image {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            })
            .unix_permissions(entry_mode(entry.path(), &relative))
            .large_file(size >= u64::from(u32::MAX));

        zip.start_file(name, options).map_err(zip_err)?;
        let mut file = File::open(entry.path())
            .io_context(|| format!("opening {}", entry.path().display()))?;
        io::copy(&mut file, &mut zip).io_context(|| format!("packaging {}", relative))?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Write `stub`, then the archive, then the payload trailer to `out`.
pub fn write_self_extracting(
    stub: &Path,
    archive: &Path,
    out: &mut File,
    cancel: &CancelToken,
) -> ForgeResult<()> {
    let mut stub_file = File::open(stub).io_context(|| format!("opening {}", stub.display()))?;
    io::copy(&mut stub_file, out).io_context(|| "writing launcher stub".to_string())?;

    let mut archive_file =
        File::open(archive).io_context(|| format!("opening {}", archive.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 20];
    let mut archive_len = 0u64;
    loop {
        cancel.checkpoint()?;
        let n = archive_file
            .read(&mut buf)
            .io_context(|| "reading bundle archive".to_string())?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        out.write_all(&buf[..n])
            .io_context(|| "writing bundle archive".to_string())?;
        archive_len += n as u64;
    }

    let trailer = PayloadTrailer {
        archive_len,
        digest: hasher.finalize().into(),
    };
    out.write_all(&trailer.to_bytes())
        .io_context(|| "writing payload trailer".to_string())?;
    Ok(())
}
