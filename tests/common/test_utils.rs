use asteroid_lab::{
    context::Context,
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

pub(crate) type Image = image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>;

/// Lifecycle counters shared by the flows of a test.
#[derive(Default)]
pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    pub dummy_state: String,
}

impl State {
    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }
}

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

/// Anything a golden image test can draw.
pub(crate) trait Subject {
    fn render<'pass>(&self) -> Render<'_, 'pass>;
}

pub(crate) struct Nothing;

impl Subject for Nothing {
    fn render<'pass>(&self) -> Render<'_, 'pass> {
        Render::None
    }
}

impl Subject for asteroid_lab::data_structures::instanced::InstancedModel {
    fn render<'pass>(&self) -> Render<'_, 'pass> {
        self.into()
    }
}

type Setup = Box<dyn Fn(&mut Context)>;
type Validate = Box<dyn Fn(&Context, &mut FrameCounter, &mut Image) -> anyhow::Result<ImageTestResult>>;

/// Draws `subject` every frame and hands the rendered image to `validate`
/// until it stops returning `Waiting`.
pub(crate) struct TestRender<T> {
    subject: T,
    setup: Setup,
    validate: Validate,
}

impl<T: Subject> TestRender<T> {
    pub(crate) fn new(
        subject: T,
        setup: impl Fn(&mut Context) + 'static,
        validate: impl Fn(&Context, &mut FrameCounter, &mut Image) -> anyhow::Result<ImageTestResult>
        + 'static,
    ) -> Self {
        Self {
            subject,
            setup: Box::new(setup),
            validate: Box::new(validate),
        }
    }
}

impl<T: Subject> GraphicsFlow<FrameCounter, ()> for TestRender<T> {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out<FrameCounter, ()> {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_update(
        &mut self,
        _: &Context,
        state: &mut FrameCounter,
        _: std::time::Duration,
    ) -> Out<FrameCounter, ()> {
        state.progress();
        Out::Empty
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass> {
        self.subject.render()
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut Image,
    ) -> anyhow::Result<ImageTestResult> {
        (self.validate)(ctx, state, texture)
    }
}

/// Runs the flow built by the async constructor `$constructor` until its
/// validation passes.
#[macro_export]
macro_rules! golden_image_test {
    ($constructor:expr) => {{
        use crate::common::test_utils::FrameCounter;
        use asteroid_lab::context::InitContext;
        use asteroid_lab::flow::{FlowConstructor, GraphicsFlow};

        let constructor: FlowConstructor<FrameCounter, ()> = Box::new(|ctx: InitContext| {
            Box::pin(async move {
                let flow: Box<dyn GraphicsFlow<FrameCounter, ()>> = Box::new(($constructor)(ctx).await);
                flow
            })
        });

        asteroid_lab::flow::run(vec![constructor]).expect("failed to run flow for integration test");
    }};
}
