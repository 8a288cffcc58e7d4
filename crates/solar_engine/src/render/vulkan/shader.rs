//! SPIR-V shader loading

use ash::{vk, Device};
use std::ffi::CStr;
use std::io::Cursor;
use std::path::Path;

use super::context::{VulkanError, VulkanResult};

/// Entry point every stage is compiled with
pub const SHADER_ENTRY_POINT: &CStr = match CStr::from_bytes_with_nul(b"main\0") {
    Ok(name) => name,
    Err(_) => panic!("invalid entry point name"),
};

/// Read a compiled shader into SPIR-V words
pub fn read_spirv<P: AsRef<Path>>(path: P) -> VulkanResult<Vec<u32>> {
    let path = path.as_ref();
    let shader_load = |source| VulkanError::ShaderLoad {
        path: path.to_path_buf(),
        source,
    };
    let bytes = std::fs::read(path).map_err(shader_load)?;
    ash::util::read_spv(&mut Cursor::new(bytes)).map_err(shader_load)
}

/// Shader module destroyed on drop
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Create a module for `stage` from SPIR-V words
    pub fn from_words(device: Device, words: &[u32], stage: vk::ShaderStageFlags) -> VulkanResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::builder().code(words);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, module, stage })
    }

    /// Load and create a module from a `.spv` file
    pub fn from_file<P: AsRef<Path>>(device: Device, path: P, stage: vk::ShaderStageFlags) -> VulkanResult<Self> {
        let words = read_spirv(&path)?;
        log::debug!("Loaded {:?} shader {:?} ({} words)", stage, path.as_ref(), words.len());
        Self::from_words(device, &words, stage)
    }

    /// Stage description for pipeline creation
    pub fn stage_info(&self) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(self.stage)
            .module(self.module)
            .name(SHADER_ENTRY_POINT)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_shader_is_named_error() {
        let err = read_spirv("does/not/exist.spv").unwrap_err();
        match err {
            VulkanError::ShaderLoad { path, .. } => assert_eq!(path, Path::new("does/not/exist.spv")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_non_spirv_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert!(matches!(read_spirv(file.path()), Err(VulkanError::ShaderLoad { .. })));
    }
}
