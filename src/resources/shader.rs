//! WGSL shaders loaded at runtime with their compilation diagnostics logged.

use crate::resources::texture::load_string;

#[derive(Debug)]
pub struct Shader {
    pub label: String,
    pub module: wgpu::ShaderModule,
}

impl Shader {
    /// Reads `assets/<file_name>` and compiles it.
    pub async fn from_file(device: &wgpu::Device, file_name: &str) -> anyhow::Result<Self> {
        let source = load_string(file_name).await?;
        Self::from_source(device, file_name, &source).await
    }

    /// Compiles `source`, logging every diagnostic with its line. Fails if the
    /// compiler reported at least one error or the module failed validation.
    pub async fn from_source(
        device: &wgpu::Device,
        label: &str,
        source: &str,
    ) -> anyhow::Result<Self> {
        // without a scope, invalid WGSL goes to the uncaptured error handler
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        let validation = device.pop_error_scope();

        let info = module.get_compilation_info().await;
        let mut errors = 0;
        for message in &info.messages {
            let line = message
                .location
                .map(|loc| loc.line_number.to_string())
                .unwrap_or_else(|| String::from("?"));
            match message.message_type {
                wgpu::CompilationMessageType::Error => {
                    errors += 1;
                    log::error!("{label}:{line}: {}", message.message);
                }
                wgpu::CompilationMessageType::Warning => {
                    log::warn!("{label}:{line}: {}", message.message)
                }
                wgpu::CompilationMessageType::Info => {
                    log::info!("{label}:{line}: {}", message.message)
                }
            }
        }
        if let Some(error) = validation.await {
            anyhow::bail!("shader {label} is invalid: {error}");
        }
        if errors > 0 {
            anyhow::bail!("shader {label} failed to compile with {errors} error(s)");
        }

        Ok(Self {
            label: label.to_string(),
            module,
        })
    }
}
