//! Keyboard-driven control panel.
//!
//! The panel holds named, bounded parameters and a few status lines. Tab or the
//! up/down arrows select a parameter, left/right adjust it by its step. The
//! text form is shown in the window title.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    value: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Parameter {
    /// A NaN bound leaves that side open, a NaN value starts at zero
    /// clamped into range and a NaN step disables adjusting.
    pub fn new(name: &str, value: f64, min: f64, max: f64, step: f64) -> Self {
        let min = if min.is_nan() { f64::NEG_INFINITY } else { min };
        let max = if max.is_nan() { f64::INFINITY } else { max };
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let value = if value.is_nan() { 0.0 } else { value };
        Self {
            name: name.to_string(),
            value: value.clamp(min, max),
            min,
            max,
            step: if step.is_nan() { 0.0 } else { step.abs() },
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Sets the value clamped to `[min, max]`. Returns whether it changed.
    pub fn set(&mut self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let value = value.clamp(self.min, self.max);
        let changed = value != self.value;
        self.value = value;
        changed
    }

    pub fn adjust(&mut self, steps: i32) -> bool {
        self.set(self.value + self.step * steps as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlPanel {
    title: String,
    parameters: Vec<Parameter>,
    selected: usize,
    status: Vec<(String, String)>,
}

impl ControlPanel {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.add_parameter(parameter);
        self
    }

    /// Adds `parameter`, replacing one with the same name.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        match self.parameters.iter_mut().find(|p| p.name == parameter.name) {
            Some(existing) => *existing = parameter,
            None => self.parameters.push(parameter),
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(Parameter::value)
    }

    pub fn set_value(&mut self, name: &str, value: f64) -> bool {
        self.parameters
            .iter_mut()
            .find(|p| p.name == name)
            .is_some_and(|p| p.set(value))
    }

    pub fn selected(&self) -> Option<&Parameter> {
        self.parameters.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.parameters.is_empty() {
            self.selected = (self.selected + 1) % self.parameters.len();
        }
    }

    pub fn select_previous(&mut self) {
        if !self.parameters.is_empty() {
            self.selected = (self.selected + self.parameters.len() - 1) % self.parameters.len();
        }
    }

    /// Moves the selected parameter by `steps`. Returns its name if the value changed.
    pub fn adjust_selected(&mut self, steps: i32) -> Option<&str> {
        let parameter = self.parameters.get_mut(self.selected)?;
        if parameter.adjust(steps) {
            log::debug!("{} = {}", parameter.name, parameter.value);
            Some(&parameter.name)
        } else {
            None
        }
    }

    pub fn set_status(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.status.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.status.push((key.to_string(), value)),
        }
    }

    pub fn status(&self, key: &str) -> Option<&str> {
        self.status
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a parameter value changed.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) -> bool {
        if state != ElementState::Pressed {
            return false;
        }
        match key {
            KeyCode::Tab | KeyCode::ArrowDown => {
                self.select_next();
                false
            }
            KeyCode::ArrowUp => {
                self.select_previous();
                false
            }
            KeyCode::ArrowRight => self.adjust_selected(1).is_some(),
            KeyCode::ArrowLeft => self.adjust_selected(-1).is_some(),
            _ => false,
        }
    }

    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => self.process_keyboard(*key, *state),
            _ => false,
        }
    }

    /// One line: title, parameters (the selected one in brackets), status.
    pub fn text(&self) -> String {
        let mut parts = vec![self.title.clone()];
        for (i, p) in self.parameters.iter().enumerate() {
            if i == self.selected {
                parts.push(format!("[{}={}]", p.name, format_value(p.value)));
            } else {
                parts.push(format!("{}={}", p.name, format_value(p.value)));
            }
        }
        for (k, v) in &self.status {
            parts.push(format!("{k}: {v}"));
        }
        parts.join(" | ")
    }
}

fn format_value(v: f64) -> String {
    if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e5) {
        format!("{v:.3e}")
    } else {
        format!("{v:.4}")
    }
}

/// A detached worker thread of which at most one runs at a time.
#[derive(Debug, Clone, Default)]
pub struct BackgroundJob {
    running: Arc<AtomicBool>,
}

struct ResetOnDrop(Arc<AtomicBool>);

impl Drop for ResetOnDrop {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BackgroundJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts `job` on a new thread unless one is still running.
    pub fn trigger<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("background job already running, trigger ignored");
            return false;
        }
        let guard = ResetOnDrop(self.running.clone());
        let spawned = std::thread::Builder::new()
            .name("background-job".into())
            .spawn(move || {
                let _guard = guard;
                job();
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                // the closure and its guard were dropped, so the flag is clear again
                log::error!("cannot spawn background job: {e}");
                false
            }
        }
    }
}

/// CPU-bound busy work for the stress test button. Returns a checksum so the
/// loop cannot be optimised away.
pub fn stress_task(iterations: u64) -> f64 {
    let started = instant::Instant::now();
    let mut acc = 0.0f64;
    for i in 0..iterations {
        let x = i as f64 * 1e-3;
        acc += x.sin() * x.cos() + (x + 1.0).sqrt();
    }
    log::info!(
        "stress task: {iterations} iterations in {:.2?}, checksum {acc:.3}",
        started.elapsed()
    );
    acc
}
