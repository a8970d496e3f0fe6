//! Flow control and the application event loop.
//!
//! A "flow" is one demo scene: it reacts to input, advances its simulation and
//! says what to draw each frame. [`run`] opens the window, builds the
//! [`Context`], constructs every flow and drives them until the window closes
//! or Escape is pressed.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scenes that handle events and rendering
//! - [`Out<S, E>`] is the output type for async work and context configuration
//!
//! # Frame
//!
//! 1. Collect window/device events and hand them to every flow
//! 2. Render the shadow map from the flows' lit geometry (if enabled)
//! 3. Render the main pass: light marker, lit models, flat geometry, custom closures
//! 4. Present, then call `on_tick` (every `tick_duration_millis`) and `on_update`

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use crate::{
    context::{Context, InitContext, MouseButtonState},
    data_structures::{
        model::{DrawLight, SceneBindings},
        texture::Texture,
    },
    pipelines::light::LightKind,
    render::{Batches, Render, draw_flats, draw_lits},
};

///
/// Output type of every lifecycle hook.
///
/// `Out::FutEvent` resolves futures of custom events which are then handed to
/// every flow's `on_custom_events` until one consumes them.
///
/// `Out::FutFn` resolves futures of state mutations which are applied directly.
///
/// `Out::Configure` modifies the Context, e.g. to move the light or change the
/// clear colour.
///
/// `Empty` is the default when nothing has to happen.
///
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    FutFn(Vec<Box<dyn Future<Output = Box<dyn FnOnce(&mut S)>>>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// A renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction; configure the context here
/// 2. `on_window_events()` and `on_device_events()` get every winit input event
/// 3. `on_update()` is called every frame
/// 4. `on_tick()` is called every `tick_duration_millis`
/// 5. `on_custom_events()` gets events produced by `Out::FutEvent`
/// 6. `on_render()` is called for the shadow pass and again for the main pass
///
pub trait GraphicsFlow<S, E> {
    /// The only place with mutable access to the Context besides `Out::Configure`.
    fn on_init(&mut self, _ctx: &mut Context, _state: &mut S) -> Out<S, E> {
        Out::Empty
    }

    /// Called every frame with the elapsed time `dt`.
    fn on_update(&mut self, _ctx: &Context, _state: &mut S, _dt: Duration) -> Out<S, E> {
        Out::Empty
    }

    fn on_tick(&mut self, _ctx: &Context, _state: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _ctx: &Context, _state: &mut S, _event: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _ctx: &Context, _state: &mut S, _event: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    /// Returns the event if it was not consumed so the next flow can see it.
    fn on_custom_events(&mut self, _ctx: &Context, _state: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render<'pass>(&self) -> Render<'_, 'pass>;

    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut S,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        Ok(ImageTestResult::Passed)
    }
}

impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// A flow factory. It gets an [`InitContext`] and asynchronously returns the
/// boxed flow, so GPU resources can be loaded before the first frame.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    #[cfg(feature = "integration-tests")]
    fn test_extent(&self) -> wgpu::Extent3d {
        // rows of the readback buffer are mapped straight into an image
        let width = self
            .ctx
            .config
            .width
            .next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT / 4);
        wgpu::Extent3d {
            width,
            height: self.ctx.config.height,
            depth_or_array_layers: 1,
        }
    }

    fn render_shadow_pass<Event: 'static>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) {
        let mut batches = Batches::default();
        graphics_flows
            .iter()
            .for_each(|flow| flow.on_render().collect(&mut batches));
        self.ctx.shadow.encode_pass(encoder, &batches.lits);
    }

    fn render<Event: 'static>(
        &mut self,
        graphics_flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
        #[cfg(feature = "integration-tests")] async_runtime: &tokio::runtime::Runtime,
        #[cfg(feature = "integration-tests")] proxy: &winit::event_loop::EventLoopProxy<
            FlowEvent<Event>,
        >,
    ) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        #[cfg(not(feature = "integration-tests"))]
        let (view, depth_view) = (
            output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            self.ctx.depth_texture.view.clone(),
        );

        #[cfg(feature = "integration-tests")]
        let (tex, view, depth_view) = {
            let extent = self.test_extent();
            let tex = Texture::create_render_target(
                &self.ctx.device,
                [extent.width, extent.height],
                self.ctx.config.format,
                "Golden Image Test Output Texture",
            );
            let depth = Texture::create_depth_texture(
                &self.ctx.device,
                [extent.width, extent.height],
                "Golden Image Test Depth Texture",
            );
            (tex.texture, tex.view, depth.view)
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if self.ctx.shadow.enabled() {
            self.render_shadow_pass(&mut encoder, graphics_flows);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let (Some(model), LightKind::Point) =
                (&self.ctx.light.model, self.ctx.light.uniform.kind())
            {
                render_pass.set_pipeline(&self.ctx.pipelines.light);
                render_pass.draw_light_model(
                    model,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }

            let mut batches = Batches::default();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().collect(&mut batches));

            let scene = SceneBindings {
                camera: &self.ctx.camera.bind_group,
                light: &self.ctx.light.bind_group,
                shadow: &self.ctx.shadow.bind_group,
            };
            draw_lits(&mut render_pass, &self.ctx.pipelines.lit, &batches.lits, scene);
            draw_flats(&mut render_pass, &self.ctx.pipelines.flat, &batches.flats);
            for custom in batches.customs {
                custom(&self.ctx, &mut render_pass);
            }
        }

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let extent = self.test_extent();
            let bytes_per_row = 4 * extent.width;
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (bytes_per_row * extent.height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Golden Image Readback"),
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(bytes_per_row),
                        rows_per_image: Some(extent.height),
                    },
                },
                extent,
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        {
            let extent = self.test_extent();
            let buffer_slice = output_buffer.slice(..);
            let data = async_runtime
                .block_on(crate::lightcurve::photometer::map_read(
                    &self.ctx.device,
                    buffer_slice,
                ))
                .map_err(|e| {
                    log::error!("golden image readback failed: {e}");
                    wgpu::SurfaceError::Lost
                })?;
            let mut img =
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(extent.width, extent.height, data)
                    .ok_or(wgpu::SurfaceError::Lost)?;
            let state = &mut self.state;
            let mut all_passed = true;
            for flow in graphics_flows.iter() {
                match flow.render_to_texture(&self.ctx, state, &mut img) {
                    Err(e) => panic!("{}", e),
                    Ok(ImageTestResult::Passed) => (),
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Waiting) => all_passed = false,
                }
            }
            if all_passed && proxy.send_event(FlowEvent::Exit).is_err() {
                log::error!("all assertions passed but the event loop is already closed");
            }
        }

        output.present();
        Ok(())
    }
}

pub struct App<State: 'static, Event: 'static> {
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<Event>>,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    last_time: Instant,
    time_since_tick: Duration,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<Event>>,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            async_runtime,
            proxy,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            time_since_tick: Duration::ZERO,
        })
    }
}

pub(crate) enum FlowEvent<Event: 'static> {
    Custom(Event),
    Exit,
}

impl<Event> Debug for FlowEvent<Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

fn is_escape(event: &WindowEvent) -> bool {
    matches!(
        event,
        WindowEvent::KeyboardInput {
            event: KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                state: ElementState::Pressed,
                ..
            },
            ..
        }
    )
}

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // resumed fires again on some platforms; everything is already set up
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        let window_attributes = Window::default_attributes().with_title("asteroid-lab");
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let app_state = AppState::new(window).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // InitContext clones share the device and queue
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        let (mut app_state, flows) = match self.async_runtime.block_on(init_future) {
            Ok(initialized) => initialized,
            Err(e) => {
                log::error!("App initialization failed. Cannot create the main context: {e}");
                event_loop.exit();
                return;
            }
        };
        log::info!("initialized {} flow(s)", flows.len());

        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);

        self.graphics_flows = flows;
        self.graphics_flows.iter_mut().for_each(|flow| {
            let events = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(
                &self.async_runtime,
                &mut app_state.state,
                &mut app_state.ctx,
                self.proxy.clone(),
                events,
            );
        });
        app_state.ctx.window.request_redraw();
        self.state = Some(app_state);
        self.last_time = Instant::now();
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<Event>) {
        match event {
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .fold(Some(custom_event), |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event?)
                        });
                    if result.is_some() {
                        log::warn!("custom event was not consumed this cycle");
                    }
                }
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if let MouseButtonState::Right = state.ctx.mouse.pressed {
                state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
        dispatch(
            &mut self.graphics_flows,
            state,
            &self.async_runtime,
            &self.proxy,
            |f, ctx, s| f.on_device_events(ctx, s, &event),
        );
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if is_escape(&event) {
            log::info!("escape pressed, exiting");
            event_loop.exit();
            return;
        }

        state.ctx.camera.controller.handle_window_events(&event);

        if let WindowEvent::CursorMoved { position, .. } = event {
            state.ctx.mouse.coords = position;
        };

        dispatch(
            &mut self.graphics_flows,
            state,
            &self.async_runtime,
            &self.proxy,
            |f, ctx, s| f.on_window_events(ctx, s, &event),
        );

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                self.time_since_tick += dt;

                // Upload the light and camera before anything samples them
                state.ctx.light.write_to_buffer(&state.ctx.queue);
                // also uploads the enabled flag, so turning shadows off reaches the shader
                state
                    .ctx
                    .shadow
                    .update(&state.ctx.queue, &state.ctx.light.uniform);
                state
                    .ctx
                    .camera
                    .update(&state.ctx.queue, &state.ctx.projection, dt);

                match state.render(
                    &mut self.graphics_flows,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => {
                        if self.time_since_tick
                            >= Duration::from_millis(state.ctx.tick_duration_millis)
                        {
                            dispatch(
                                &mut self.graphics_flows,
                                state,
                                &self.async_runtime,
                                &self.proxy,
                                |f, ctx, s| f.on_tick(ctx, s),
                            );
                            self.time_since_tick = Duration::ZERO;
                        }
                        dispatch(
                            &mut self.graphics_flows,
                            state,
                            &self.async_runtime,
                            &self.proxy,
                            |f, ctx, s| f.on_update(ctx, s, dt),
                        );
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state.is_pressed()) {
                (MouseButton::Left, true) => state.ctx.mouse.pressed = MouseButtonState::Left,
                (MouseButton::Right, true) => state.ctx.mouse.pressed = MouseButtonState::Right,
                (_, false) => state.ctx.mouse.pressed = MouseButtonState::None,
                _ => (),
            },
            _ => {}
        }
    }
}

/// Runs `hook` on every flow in order and applies each output before the next
/// flow sees the context.
fn dispatch<State: 'static, Event: 'static>(
    flows: &mut [Box<dyn GraphicsFlow<State, Event>>],
    app_state: &mut AppState<State>,
    async_runtime: &tokio::runtime::Runtime,
    proxy: &winit::event_loop::EventLoopProxy<FlowEvent<Event>>,
    mut hook: impl FnMut(&mut Box<dyn GraphicsFlow<State, Event>>, &Context, &mut State) -> Out<State, Event>,
) {
    for flow in flows.iter_mut() {
        let out = hook(flow, &app_state.ctx, &mut app_state.state);
        handle_flow_output(
            async_runtime,
            &mut app_state.state,
            &mut app_state.ctx,
            proxy.clone(),
            out,
        );
    }
}

fn handle_flow_output<State, Event: 'static>(
    async_runtime: &tokio::runtime::Runtime,
    state: &mut State,
    ctx: &mut Context,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<Event>>,
    out: Out<State, Event>,
) {
    match out {
        // Send the events passed by the user to winit
        Out::FutEvent(futures) => {
            let fut =
                async move { futures::future::join_all(futures.into_iter().map(Pin::from)).await };
            let resolved = async_runtime.block_on(fut);
            for event in resolved {
                if let Err(err) = proxy.send_event(FlowEvent::Custom(event)) {
                    log::error!("event loop closed before all events could be processed: {err}");
                    return;
                }
            }
        }
        Out::FutFn(futures) => {
            let mutations: Vec<Pin<Box<dyn Future<Output = Box<dyn FnOnce(&mut State)>>>>> =
                futures.into_iter().map(Pin::from).collect();
            let fut = async move { futures::future::join_all(mutations).await };
            let resolved: Vec<Box<dyn FnOnce(&mut State)>> = async_runtime.block_on(fut);
            resolved.into_iter().for_each(|mutation| {
                mutation(state);
            });
        }
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

pub fn run<State: 'static + Default, Event: 'static>(
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        eprintln!("Warning: Could not initialize logger: {}", e);
    };

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<Event>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<Event>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(all(
        feature = "integration-tests",
        any(target_os = "linux", target_os = "windows")
    )))]
    let event_loop: EventLoop<FlowEvent<Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
