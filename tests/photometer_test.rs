#![cfg(feature = "integration-tests")]

mod common;

use asteroid_lab::{
    Point3, Vector3,
    context::{Context, InitContext},
    data_structures::{instance::Instance, instanced::InstancedModel},
    flow::{GraphicsFlow, ImageTestResult, Out},
    lightcurve::{LightcurveConfig, Photometer},
    pipelines::light::LightUniform,
    render::Render,
    resources::ellipsoid_model,
};
use common::test_utils::{FrameCounter, Image};
use instant::Duration;

/// Measures a lit sphere and an empty scene from the same observer.
struct LitAndDark {
    sphere: InstancedModel,
    photometer: Option<Photometer>,
    lit: Option<f64>,
    dark: Option<f64>,
}

impl GraphicsFlow<FrameCounter, ()> for LitAndDark {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        ctx.light.uniform = LightUniform::directional(Vector3::new(0.3, 0.3, 1.0), [1.0, 1.0, 1.0]);
        // 100 pixels wide gives a padded row of 512 bytes
        let config = LightcurveConfig {
            size: [100, 60],
            ..Default::default()
        };
        self.photometer = Some(Photometer::new(ctx, &config));
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut FrameCounter, _: Duration) -> Out<FrameCounter, ()> {
        let Some(photometer) = &self.photometer else {
            return Out::Empty;
        };
        let eye = Point3::new(0.0, 0.0, 5.0);
        let target = Point3::new(0.0, 0.0, 0.0);
        self.lit = Some(photometer.measure(ctx, eye, target, (&self.sphere).into()).unwrap());
        self.dark = Some(photometer.measure(ctx, eye, target, Render::None).unwrap());
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }

    fn render_to_texture(
        &self,
        _: &Context,
        _: &mut FrameCounter,
        _: &mut Image,
    ) -> anyhow::Result<ImageTestResult> {
        let (Some(lit), Some(dark)) = (self.lit, self.dark) else {
            return Ok(ImageTestResult::Waiting);
        };
        assert!(lit > 0.0 && lit <= 1.0, "lit sphere measured {lit}");
        assert_eq!(dark, 0.0);
        Ok(ImageTestResult::Passed)
    }
}

#[test]
fn should_measure_a_lit_sphere_brighter_than_an_empty_scene() {
    golden_image_test!(async move |ctx: InitContext| {
        let model = ellipsoid_model([1.0; 3], &ctx.device, &ctx.queue, &ctx.material_layout);
        LitAndDark {
            sphere: InstancedModel::single(&ctx.device, model),
            photometer: None,
            lit: None,
            dark: None,
        }
    });
}

/// A sphere above a plate, measured once with shadows and once without.
struct ShadowedPlate {
    plate: InstancedModel,
    sphere: InstancedModel,
    photometer: Option<Photometer>,
    shadowed: Option<f64>,
    unshadowed: Option<f64>,
}

impl ShadowedPlate {
    fn measure(&self, ctx: &Context) -> Option<f64> {
        let photometer = self.photometer.as_ref()?;
        let render = Render::Composed(vec![(&self.plate).into(), (&self.sphere).into()]);
        let eye = Point3::new(0.0, 10.0, 3.0);
        let target = Point3::new(-0.75, -1.5, 0.0);
        Some(photometer.measure(ctx, eye, target, render).unwrap())
    }
}

impl GraphicsFlow<FrameCounter, ()> for ShadowedPlate {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        // the sun sits to the upper right, the shadow falls left of the sphere
        ctx.light.uniform = LightUniform::directional(Vector3::new(1.0, 1.0, 0.0), [1.0, 1.0, 1.0]);
        ctx.shadow.scene_center = Point3::new(0.0, -0.5, 0.0);
        ctx.shadow.scene_radius = 7.0;
        ctx.shadow.set_enabled(true);
        let mut photometer = Photometer::new(ctx, &LightcurveConfig::default());
        photometer.set_fovy(asteroid_lab::Deg(40.0));
        self.photometer = Some(photometer);
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut FrameCounter, _: Duration) -> Out<FrameCounter, ()> {
        if self.shadowed.is_none() {
            self.shadowed = self.measure(ctx);
            return Out::Configure(Box::new(|ctx| ctx.shadow.set_enabled(false)));
        }
        if self.unshadowed.is_none() {
            self.unshadowed = self.measure(ctx);
        }
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }

    fn render_to_texture(
        &self,
        _: &Context,
        _: &mut FrameCounter,
        _: &mut Image,
    ) -> anyhow::Result<ImageTestResult> {
        let (Some(shadowed), Some(unshadowed)) = (self.shadowed, self.unshadowed) else {
            return Ok(ImageTestResult::Waiting);
        };
        assert!(
            shadowed < unshadowed,
            "shadows on {shadowed} is not darker than shadows off {unshadowed}"
        );
        Ok(ImageTestResult::Passed)
    }
}

#[test]
fn should_darken_the_plate_under_a_shadow() {
    golden_image_test!(async move |ctx: InitContext| {
        let plate = ellipsoid_model([6.0, 0.05, 6.0], &ctx.device, &ctx.queue, &ctx.material_layout);
        let sphere = ellipsoid_model([1.0; 3], &ctx.device, &ctx.queue, &ctx.material_layout);
        ShadowedPlate {
            plate: InstancedModel::new(
                &ctx.device,
                plate,
                vec![Instance::from(Vector3::new(0.0, -1.5, 0.0))],
            ),
            sphere: InstancedModel::single(&ctx.device, sphere),
            photometer: None,
            shadowed: None,
            unshadowed: None,
        }
    });
}
