#![allow(dead_code)]

use anyhow::ensure;
use sane_client::{
    simulated::{SimulatedDevice, TestPicture},
    Color, ColorModel, Image, OptionValue, Scanner,
};
use std::sync::Arc;

pub fn init_logger() {
    _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Trace)
        .init();
}

pub fn open(device: SimulatedDevice) -> (Arc<SimulatedDevice>, Scanner) {
    init_logger();

    let device = Arc::new(device);
    let scanner = Scanner::new(device.clone());

    (device, scanner)
}

pub fn text(text: &str) -> OptionValue {
    OptionValue::String(text.into())
}

/// Selects the color pattern in the given mode.
pub fn pattern(scanner: &mut Scanner, mode: &str) -> anyhow::Result<()> {
    scanner.set_option("mode", &text(mode))?;
    scanner.set_option("test-picture", &text("Color pattern"))?;
    Ok(())
}

fn threshold(level: u8) -> u8 {
    if level >= 0x80 {
        0xFF
    } else {
        0x00
    }
}

fn wide(level: u8) -> u16 {
    u16::from(level) * 0x0101
}

fn check_size(image: &Image) -> anyhow::Result<()> {
    ensure!(
        image.width() > 0 && image.height() > 0,
        "bad size {}x{}",
        image.width(),
        image.height()
    );
    Ok(())
}

pub fn check_gray(image: &Image) -> anyhow::Result<()> {
    check_size(image)?;

    let model = image.color_model();
    ensure!(
        matches!(model, ColorModel::Gray | ColorModel::Gray16),
        "bad color model {model:?}"
    );

    for y in 0..image.height() {
        for x in 0..image.width() {
            let level = TestPicture::ColorPattern.level(x, y, None);
            let expected = match image.depth() {
                1 => Color::Gray(threshold(level)),
                16 => Color::Gray16(wide(level)),
                _ => Color::Gray(level),
            };

            let actual = image.pixel(x, y);
            ensure!(
                actual == expected,
                "bad pixel at ({x},{y}): {actual:?} should be {expected:?}"
            );
        }
    }

    Ok(())
}

pub fn check_color(image: &Image) -> anyhow::Result<()> {
    check_size(image)?;

    let model = image.color_model();
    ensure!(
        matches!(model, ColorModel::Rgba | ColorModel::Rgba64),
        "bad color model {model:?}"
    );

    for y in 0..image.height() {
        for x in 0..image.width() {
            let [r, g, b] = [0, 1, 2].map(|ch| TestPicture::ColorPattern.level(x, y, Some(ch)));
            let expected = match image.depth() {
                1 => Color::Rgba([threshold(r), threshold(g), threshold(b), 0xFF]),
                16 => Color::Rgba64([wide(r), wide(g), wide(b), 0xFFFF]),
                _ => Color::Rgba([r, g, b, 0xFF]),
            };

            let actual = image.pixel(x, y);
            ensure!(
                actual == expected,
                "bad pixel at ({x},{y}): {actual:?} should be {expected:?}"
            );
        }
    }

    Ok(())
}
