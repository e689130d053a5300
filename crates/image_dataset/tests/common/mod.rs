#![allow(dead_code)]

use anyhow::Result;
use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes a solid-colour PNG and returns its path.
pub fn write_solid(dir: &Path, name: &str, width: u32, height: u32, rgb: [u8; 3]) -> Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    RgbImage::from_pixel(width, height, Rgb(rgb)).save(&path)?;
    Ok(path)
}

/// Writes a PNG filled with pseudo-random pixels. Noise keeps the compressed
/// stream close to the raw size, so cutting the file leaves the header intact.
pub fn write_noise(dir: &Path, name: &str, side: u32, seed: u32) -> Result<PathBuf> {
    let mut state = seed;
    let mut next = move || {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (state >> 24) as u8
    };
    let image = RgbImage::from_fn(side, side, |_, _| Rgb([next(), next(), next()]));
    let path = dir.join(name);
    image.save(&path)?;
    Ok(path)
}

/// Copies `src` to `dst`, keeping only the first `numerator / denominator` of
/// its bytes.
pub fn truncate_copy(src: &Path, dst: &Path, numerator: usize, denominator: usize) -> Result<PathBuf> {
    let bytes = fs::read(src)?;
    let keep = bytes.len() * numerator / denominator;
    fs::write(dst, &bytes[..keep])?;
    Ok(dst.to_path_buf())
}

/// Writes an uncompressed 8-bit MONOCHROME2 DICOM file of `width` x `height`
/// with a horizontal ramp as pixel data.
pub fn write_dicom(dir: &Path, name: &str, width: u16, height: u16) -> Result<PathBuf> {
    const INSTANCE_UID: &str = "2.25.1";

    let pixels: Vec<u8> = (0..height as usize)
        .flat_map(|_| (0..width as usize).map(|x| (x * 40) as u8))
        .collect();
    let object = InMemDicomObject::from_element_iter([
        DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(uids::SECONDARY_CAPTURE_IMAGE_STORAGE),
        ),
        DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(INSTANCE_UID)),
        DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)),
        DataElement::new(
            tags::PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            PrimitiveValue::from("MONOCHROME2"),
        ),
        DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(height)),
        DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(width)),
        DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8_u16)),
        DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(8_u16)),
        DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(7_u16)),
        DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)),
        DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::from(pixels)),
    ]);

    let file = object.with_meta(
        FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(INSTANCE_UID),
    )?;
    let path = dir.join(name);
    file.write_to_file(&path)?;
    Ok(path)
}

/// Copies a PNG to `dst` with `count` bytes inverted in the middle of its
/// first IDAT chunk. The length stays the same; the chunk checksum no
/// longer matches.
pub fn corrupt_idat(src: &Path, dst: &Path, count: usize) -> Result<PathBuf> {
    let mut bytes = fs::read(src)?;
    let tag = bytes
        .windows(4)
        .position(|w| w == b"IDAT")
        .ok_or_else(|| anyhow::anyhow!("No IDAT chunk in {}", src.display()))?;
    let length = u32::from_be_bytes([
        bytes[tag - 4],
        bytes[tag - 3],
        bytes[tag - 2],
        bytes[tag - 1],
    ]) as usize;
    let start = tag + 4 + length / 2;
    for byte in &mut bytes[start..start + count] {
        *byte = !*byte;
    }
    fs::write(dst, &bytes)?;
    Ok(dst.to_path_buf())
}
