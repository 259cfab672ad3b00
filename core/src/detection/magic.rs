//! Header sniffing for disc images and executables with ambiguous extensions.

use emuforge_shared::Platform;

const SECTOR_COOKED: usize = 2048;
const SECTOR_RAW: usize = 2352;
const PVD_SECTOR: usize = 16;

const CD_SYNC: [u8; 12] = [
    0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00,
];

const GAMECUBE_MAGIC: [u8; 4] = [0xC2, 0x33, 0x9F, 0x3D];
const GAMECUBE_MAGIC_OFFSET: usize = 0x1C;
const WII_MAGIC: [u8; 4] = [0x5D, 0x1C, 0x9E, 0xA3];
const WII_MAGIC_OFFSET: usize = 0x18;

/// RVZ and WIA files keep a copy of the disc header at this offset.
const WIA_DISC_HEADER_OFFSET: usize = 0x58;

const XBOX_MAGIC: &[u8] = b"MICROSOFT*XBOX*MEDIA";
const XBOX_MAGIC_OFFSET: usize = 0x10000;

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const EM_MIPS: u16 = 8;
const EM_PPC: u16 = 20;
const EM_PPC64: u16 = 21;

fn bytes_at(header: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    header.get(offset..offset.checked_add(len)?)
}

fn has_at(header: &[u8], offset: usize, magic: &[u8]) -> bool {
    bytes_at(header, offset, magic.len()) == Some(magic)
}

/// ISO9660 primary volume descriptor fields.
struct VolumeDescriptor<'a> {
    system_id: &'a [u8],
    volume_id: &'a [u8],
    raw_sectors: bool,
}

fn volume_descriptor(header: &[u8]) -> Option<VolumeDescriptor<'_>> {
    let cooked = PVD_SECTOR * SECTOR_COOKED;
    let raw = PVD_SECTOR * SECTOR_RAW;

    // Cooked images first, then raw Mode 2 (24 byte prefix) and Mode 1 (16).
    let candidates = [
        (cooked, false),
        (raw + 24, true),
        (raw + 16, true),
    ];

    candidates.into_iter().find_map(|(data, raw_sectors)| {
        if raw_sectors && !has_at(header, raw, &CD_SYNC) {
            return None;
        }
        if header.get(data) != Some(&1) || !has_at(header, data + 1, b"CD001") {
            return None;
        }
        Some(VolumeDescriptor {
            system_id: bytes_at(header, data + 8, 32)?,
            volume_id: bytes_at(header, data + 40, 32)?,
            raw_sectors,
        })
    })
}

fn trimmed(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|b| *b != b' ' && *b != 0)
        .map_or(0, |i| i + 1);
    &field[..end]
}

fn sniff_iso9660(header: &[u8]) -> Option<Platform> {
    let pvd = volume_descriptor(header)?;
    let system = trimmed(pvd.system_id);
    let volume = trimmed(pvd.volume_id);

    if system == b"PSP GAME" {
        Some(Platform::Psp)
    } else if system == b"PS3VOLUME" || volume == b"PS3VOLUME" {
        Some(Platform::Ps3)
    } else if system == b"PLAYSTATION" {
        // PS2 DVDs are distributed as cooked 2048-byte images; PS1 CDs as raw dumps.
        Some(if pvd.raw_sectors {
            Platform::Ps1
        } else {
            Platform::Ps2
        })
    } else {
        None
    }
}

fn sniff_nintendo_disc(header: &[u8], base: usize) -> Option<Platform> {
    if has_at(header, base + WII_MAGIC_OFFSET, &WII_MAGIC) {
        Some(Platform::Wii)
    } else if has_at(header, base + GAMECUBE_MAGIC_OFFSET, &GAMECUBE_MAGIC) {
        Some(Platform::GameCube)
    } else {
        None
    }
}

fn sniff_elf(header: &[u8]) -> Option<Platform> {
    if !has_at(header, 0, &ELF_MAGIC) {
        return None;
    }
    let raw: [u8; 2] = bytes_at(header, 0x12, 2)?.try_into().ok()?;
    let machine = match header.get(5) {
        Some(2) => u16::from_be_bytes(raw),
        _ => u16::from_le_bytes(raw),
    };
    match machine {
        EM_MIPS => Some(Platform::Ps2),
        EM_PPC => Some(Platform::GameCube),
        EM_PPC64 => Some(Platform::Ps3),
        _ => None,
    }
}

/// Identify a platform from the leading bytes of a file.
///
/// `ext` is the lowercase extension and only steers which formats are tried.
pub fn sniff(ext: &str, header: &[u8]) -> Option<Platform> {
    match ext {
        "rvz" | "wia" => sniff_nintendo_disc(header, WIA_DISC_HEADER_OFFSET),
        "elf" => sniff_elf(header),
        _ => sniff_iso9660(header)
            .or_else(|| sniff_nintendo_disc(header, 0))
            .or_else(|| has_at(header, XBOX_MAGIC_OFFSET, XBOX_MAGIC).then_some(Platform::Xbox))
            .or_else(|| sniff_elf(header)),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Synthetic headers shared by detector tests.

    use super::*;

    pub fn cooked_iso(system_id: &str) -> Vec<u8> {
        let mut header = vec![0u8; PVD_SECTOR * SECTOR_COOKED + SECTOR_COOKED];
        write_pvd(&mut header, PVD_SECTOR * SECTOR_COOKED, system_id, "");
        header
    }

    pub fn raw_iso(system_id: &str) -> Vec<u8> {
        let sector = PVD_SECTOR * SECTOR_RAW;
        let mut header = vec![0u8; sector + SECTOR_RAW];
        header[sector..sector + 12].copy_from_slice(&CD_SYNC);
        write_pvd(&mut header, sector + 24, system_id, "");
        header
    }

    pub fn cooked_iso_with_volume(volume_id: &str) -> Vec<u8> {
        let mut header = vec![0u8; PVD_SECTOR * SECTOR_COOKED + SECTOR_COOKED];
        write_pvd(&mut header, PVD_SECTOR * SECTOR_COOKED, "", volume_id);
        header
    }

    fn write_pvd(header: &mut [u8], at: usize, system_id: &str, volume_id: &str) {
        header[at] = 1;
        header[at + 1..at + 6].copy_from_slice(b"CD001");
        let mut sys = [b' '; 32];
        sys[..system_id.len()].copy_from_slice(system_id.as_bytes());
        header[at + 8..at + 40].copy_from_slice(&sys);
        let mut vol = [b' '; 32];
        vol[..volume_id.len()].copy_from_slice(volume_id.as_bytes());
        header[at + 40..at + 72].copy_from_slice(&vol);
    }

    pub fn gamecube_disc() -> Vec<u8> {
        let mut header = vec![0u8; 0x440];
        header[GAMECUBE_MAGIC_OFFSET..GAMECUBE_MAGIC_OFFSET + 4].copy_from_slice(&GAMECUBE_MAGIC);
        header
    }

    pub fn wii_disc() -> Vec<u8> {
        let mut header = vec![0u8; 0x440];
        header[WII_MAGIC_OFFSET..WII_MAGIC_OFFSET + 4].copy_from_slice(&WII_MAGIC);
        header
    }

    pub fn rvz_wii() -> Vec<u8> {
        let mut header = b"RVZ\x01".to_vec();
        header.resize(0x100, 0);
        let at = WIA_DISC_HEADER_OFFSET + WII_MAGIC_OFFSET;
        header[at..at + 4].copy_from_slice(&WII_MAGIC);
        header
    }

    pub fn xbox_disc() -> Vec<u8> {
        let mut header = vec![0u8; XBOX_MAGIC_OFFSET + 0x20];
        header[XBOX_MAGIC_OFFSET..XBOX_MAGIC_OFFSET + XBOX_MAGIC.len()].copy_from_slice(XBOX_MAGIC);
        header
    }

    pub fn elf(machine: u16, big_endian: bool) -> Vec<u8> {
        let mut header = vec![0u8; 0x40];
        header[..4].copy_from_slice(&ELF_MAGIC);
        header[5] = if big_endian { 2 } else { 1 };
        let bytes = if big_endian {
            machine.to_be_bytes()
        } else {
            machine.to_le_bytes()
        };
        header[0x12..0x14].copy_from_slice(&bytes);
        header
    }
}
