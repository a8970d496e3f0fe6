#![cfg(feature = "integration-tests")]

mod common;

use asteroid_lab::{context::Context, flow::ImageTestResult};
use common::test_utils::{FrameCounter, Nothing, TestRender};
use wgpu::Color;

#[test]
fn should_render_clear_colour() {
    golden_image_test!(async move |_: asteroid_lab::context::InitContext| {
        TestRender::new(
            Nothing,
            |ctx: &mut Context| {
                ctx.clear_colour = Color::WHITE;
                ctx.camera.camera.position = [0.0, 5.0, 2.0].into();
            },
            |_, state: &mut FrameCounter, texture| {
                if state.frame() == 0 {
                    return Ok(ImageTestResult::Waiting);
                }
                let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                let colour = Color::WHITE;
                let desired_pixel = image::Rgba([
                    f_to_u8(colour.r),
                    f_to_u8(colour.g),
                    f_to_u8(colour.b),
                    f_to_u8(colour.a),
                ]);
                for pixel in texture.pixels() {
                    assert_eq!(*pixel, desired_pixel);
                }
                Ok(ImageTestResult::Passed)
            },
        )
    });
}
