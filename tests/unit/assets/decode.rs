use std::io::Cursor;

use super::*;

#[test]
fn decode_image_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!(prepared.width, 1);
    assert_eq!(prepared.height, 1);
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_image_rejects_garbage() {
    assert!(decode_image(b"not an image").is_err());
}

#[test]
fn raster_image_checks_buffer_size() {
    assert!(RasterImage::from_premul_rgba8(2, 2, vec![0; 15]).is_err());
    assert!(RasterImage::from_premul_rgba8(0, 2, vec![]).is_err());
    let solid = RasterImage::solid(2, 1, Rgba8Premul::black()).unwrap();
    assert_eq!(solid.rgba8_premul.as_slice(), &[0, 0, 0, 255, 0, 0, 0, 255]);
    assert!(solid.same_pixels(&solid.clone()));
}

fn wav_bytes(spec: hound::WavSpec, write: impl FnOnce(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
        write(&mut w);
        w.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn decode_wav_int16_normalizes() {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 24_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let bytes = wav_bytes(spec, |w| {
        w.write_sample(16_384i16).unwrap();
        w.write_sample(-32_768i16).unwrap();
    });
    let buf = decode_wav(Cursor::new(bytes)).unwrap();
    assert_eq!(buf.sample_rate(), 24_000);
    assert_eq!(buf.samples(), &[0.5, -1.0]);
}

#[test]
fn decode_wav_float_stereo() {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 48_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let bytes = wav_bytes(spec, |w| {
        for s in [0.25f32, -0.25, 0.5, -0.5] {
            w.write_sample(s).unwrap();
        }
    });
    let buf = decode_wav(Cursor::new(bytes)).unwrap();
    assert_eq!(buf.channels(), 2);
    assert_eq!(buf.frames(), 2);
    assert_eq!(buf.samples(), &[0.25, -0.25, 0.5, -0.5]);
}

#[test]
fn decode_wav_rejects_garbage() {
    assert!(decode_wav(Cursor::new(b"RIFFxxxx".to_vec())).is_err());
}
