//! Filesystem fixtures shared by the unit tests.

use std::{fs, path::Path, path::PathBuf};

/// A fresh, empty directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vmt-import-{}-{name}", std::process::id()));
    if dir.exists() {
        fs::remove_dir_all(&dir).unwrap();
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A 7.2 BGRA8888 2x2 texture of one colour, given in file byte order.
pub fn write_vtf(path: &Path, bgra: [u8; 4]) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"VTF\0");
    bytes.extend_from_slice(&7u32.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&80u32.to_le_bytes()); // header size
    bytes.extend_from_slice(&2u16.to_le_bytes()); // width
    bytes.extend_from_slice(&2u16.to_le_bytes()); // height
    bytes.extend_from_slice(&0x2000u32.to_le_bytes()); // EIGHTBITALPHA
    bytes.extend_from_slice(&1u16.to_le_bytes()); // frames
    bytes.extend_from_slice(&0u16.to_le_bytes()); // first frame
    bytes.extend_from_slice(&[0; 4 + 12 + 4 + 4]); // padding, reflectivity, bumpmap scale
    bytes.extend_from_slice(&12i32.to_le_bytes()); // BGRA8888
    bytes.push(1); // mips
    bytes.extend_from_slice(&(-1i32).to_le_bytes()); // no thumbnail
    bytes.extend_from_slice(&[0, 0]);
    assert_eq!(bytes.len(), 63);
    bytes.extend_from_slice(&1i16.to_le_bytes()); // depth
    bytes.resize(80, 0);
    for _ in 0..4 {
        bytes.extend_from_slice(&bgra);
    }

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, bytes).unwrap();
}
