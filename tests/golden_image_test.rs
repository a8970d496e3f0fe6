#![cfg(feature = "integration-tests")]

mod common;

use asteroid_lab::{
    context::{Context, InitContext},
    data_structures::instanced::InstancedModel,
    flow::ImageTestResult,
    resources::ellipsoid_model,
};
use common::test_utils::{FrameCounter, TestRender};
use wgpu::Color;

fn brightness(pixel: &image::Rgba<u8>) -> u32 {
    pixel.0[..3].iter().map(|&c| c as u32).sum()
}

#[test]
fn should_light_an_ellipsoid_in_front_of_the_camera() {
    golden_image_test!(async move |ctx: InitContext| {
        let model = ellipsoid_model([1.0, 0.8, 0.6], &ctx.device, &ctx.queue, &ctx.material_layout);
        TestRender::new(
            InstancedModel::single(&ctx.device, model),
            |ctx: &mut Context| {
                ctx.clear_colour = Color::BLACK;
                ctx.camera.camera.position = [0.0, 0.0, 5.0].into();
                ctx.camera.camera.look_at([0.0, 0.0, 0.0].into());
            },
            |_, state: &mut FrameCounter, actual| {
                if state.frame() == 0 {
                    return Ok(ImageTestResult::Waiting);
                }
                let (width, height) = actual.dimensions();
                let centre = actual.get_pixel(width / 2, height / 2);
                assert!(brightness(centre) > 60, "centre pixel is dark: {centre:?}");

                for (x, y) in [(0, 0), (width - 1, 0), (0, height - 1), (width - 1, height - 1)] {
                    assert_eq!(brightness(actual.get_pixel(x, y)), 0, "corner ({x}, {y}) is lit");
                }
                Ok(ImageTestResult::Passed)
            },
        )
    });
}

#[test]
fn should_darken_the_night_side() {
    golden_image_test!(async move |ctx: InitContext| {
        let model = ellipsoid_model([1.0; 3], &ctx.device, &ctx.queue, &ctx.material_layout);
        TestRender::new(
            InstancedModel::single(&ctx.device, model),
            |ctx: &mut Context| {
                ctx.clear_colour = Color::BLACK;
                ctx.camera.camera.position = [0.0, 0.0, 5.0].into();
                ctx.camera.camera.look_at([0.0, 0.0, 0.0].into());
                // sun from the right
                ctx.light.uniform = asteroid_lab::pipelines::light::LightUniform::directional(
                    [1.0, 0.0, 0.0].into(),
                    [1.0, 1.0, 1.0],
                );
            },
            |_, state: &mut FrameCounter, actual| {
                if state.frame() == 0 {
                    return Ok(ImageTestResult::Waiting);
                }
                let (width, height) = actual.dimensions();
                let row = height / 2;
                // the sphere spans roughly a fifth of the width around the centre
                let offset = width / 16;
                let day = brightness(actual.get_pixel(width / 2 + offset, row));
                let night = brightness(actual.get_pixel(width / 2 - offset, row));
                assert!(day > night, "day side {day} is not brighter than night side {night}");
                Ok(ImageTestResult::Passed)
            },
        )
    });
}
