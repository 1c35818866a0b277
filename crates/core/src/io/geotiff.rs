//! Native GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Supports what the criterion layers need: one band, a north-up
//! transform (pixel scale + tie point), the GDAL no-data tag and the EPSG
//! code carried in the GeoKey directory.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

fn tiff_err(what: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Other(format!("{what}: {e}"))
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode(BufReader::new(file))
}

/// Read a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode(Cursor::new(data))
}

fn cast_all<S: NumCast + Copy, T: RasterElement>(buf: &[S]) -> Vec<T> {
    buf.iter()
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;
    let (width, height) = decoder.dimensions().map_err(tiff_err("Cannot read dimensions"))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<T> = match decoder.read_image().map_err(tiff_err("Cannot read image data"))? {
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    // Multi-band files decode interleaved; keep the first band only.
    let bands = data.len() / (rows * cols).max(1);
    let data = match bands {
        0 => return Err(Error::InvalidDimensions { width: cols, height: rows }),
        1 => data,
        n => data.into_iter().step_by(n).collect(),
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;
    if let Some(transform) = read_transform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(read_nodata(&mut decoder));
    if raster.nodata().is_none() && T::is_float() {
        raster.set_nodata(Some(T::default_nodata()));
    }

    Ok(raster)
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::Unknown(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::Unknown(GEO_KEY_DIRECTORY)).ok()?;
    let lookup = |key: u16| {
        keys.get(4..)?
            .chunks_exact(4)
            .find(|entry| entry[0] == key && entry[1] == 0)
            .map(|entry| entry[3])
    };

    // 32767 is the GeoTIFF "user-defined" marker, not an EPSG code
    let code = |v: u16| (v != 0 && v != 32767).then_some(v);

    if let Some(epsg) = lookup(PROJECTED_CS_TYPE_KEY).and_then(code) {
        return Some(CRS::from_epsg(epsg.into()));
    }
    if let Some(epsg) = lookup(GEOGRAPHIC_TYPE_KEY).and_then(code) {
        return Some(CRS::from_epsg(epsg.into()));
    }
    (lookup(GT_MODEL_TYPE_KEY) == Some(MODEL_TYPE_GEOGRAPHIC)).then(CRS::wgs84)
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::Unknown(GDAL_NODATA)).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    num_traits::cast(value).or_else(|| value.is_nan().then(T::default_nodata))
}

/// Write a Raster to a single-band 32-bit float GeoTIFF file.
///
/// Invalid cells are written as NaN and flagged through the GDAL no-data tag.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode(raster, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(raster: &Raster<T>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn geo_keys(crs: Option<&CRS>) -> Vec<u16> {
    let mut entries = vec![(GT_RASTER_TYPE_KEY, RASTER_PIXEL_IS_AREA)];
    match crs {
        Some(crs) if crs.is_geographic() => {
            entries.push((GT_MODEL_TYPE_KEY, MODEL_TYPE_GEOGRAPHIC));
            if let Some(code) = crs.epsg().and_then(|c| u16::try_from(c).ok()) {
                entries.push((GEOGRAPHIC_TYPE_KEY, code));
            }
        }
        Some(crs) => {
            entries.push((GT_MODEL_TYPE_KEY, MODEL_TYPE_PROJECTED));
            if let Some(code) = crs.epsg().and_then(|c| u16::try_from(c).ok()) {
                entries.push((PROJECTED_CS_TYPE_KEY, code));
            }
        }
        None => entries.push((GT_MODEL_TYPE_KEY, MODEL_TYPE_PROJECTED)),
    }
    entries.sort_unstable();

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    for (key, value) in entries {
        keys.extend_from_slice(&[key, 0, 1, value]);
    }
    keys
}

fn encode<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;
    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| {
            if raster.is_nodata(v) {
                f32::NAN
            } else {
                num_traits::cast(v).unwrap_or(f32::NAN)
            }
        })
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    let keys = geo_keys(raster.crs());
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &keys[..])
        .map_err(tiff_err("Cannot write geokey tag"))?;

    image
        .encoder()
        .write_tag(Tag::Unknown(GDAL_NODATA), "nan")
        .map_err(tiff_err("Cannot write nodata tag"))?;

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_roundtrip_keeps_grid_and_nodata() {
        let mut layer: Raster<f64> = Raster::filled(3, 4, 0.25);
        layer.set_transform(GeoTransform::new(350_000.0, 4_500_000.0, 5.0, -5.0));
        layer.set_crs(Some(CRS::etrs89_utm30n()));
        layer.set_nodata(Some(f64::NAN));
        layer.set(1, 2, f64::NAN).unwrap();

        let bytes = write_geotiff_to_buffer(&layer).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();

        assert!(layer.same_grid(&back));
        assert_eq!(back.crs().and_then(CRS::epsg), Some(25830));
        assert!(!back.is_valid_at(1, 2).unwrap());
        assert_eq!(back.valid_count(), 11);
        assert!((back.get(0, 0).unwrap() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_geographic_keys() {
        let keys = geo_keys(Some(&CRS::wgs84()));
        assert_eq!(keys[3], 3);
        assert!(keys.chunks_exact(4).skip(1).any(|e| e[0] == GEOGRAPHIC_TYPE_KEY && e[3] == 4326));
        assert!(keys.chunks_exact(4).skip(1).any(|e| e[0] == GT_MODEL_TYPE_KEY && e[3] == MODEL_TYPE_GEOGRAPHIC));
    }

    #[test]
    fn test_class_raster_nodata_written_as_nan() {
        let mut classes: Raster<i32> = Raster::filled(2, 2, 4);
        classes.set_nodata(Some(i32::MIN));
        classes.set(0, 0, i32::MIN).unwrap();

        let bytes = write_geotiff_to_buffer(&classes).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes).unwrap();
        assert!(back.get(0, 0).unwrap().is_nan());
        assert_eq!(back.get(1, 1).unwrap(), 4.0);
    }
}
