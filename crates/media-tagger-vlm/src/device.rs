use candle_core::{DType, Device};

/// Pick the compute device and dtype for inference.
///
/// An accelerator is used when the crate was built with `cuda` or `metal` and a
/// device is present, otherwise the CPU with f32. Half precision is only used on
/// accelerators and only when `half_precision` is requested.
pub fn select_device(half_precision: bool) -> (Device, DType) {
    match accelerator(half_precision) {
        Some((device, dtype)) => {
            log::info!("Using accelerator {device:?} with {dtype:?}");
            (device, dtype)
        }
        None => (Device::Cpu, DType::F32),
    }
}

#[cfg(feature = "cuda")]
fn accelerator(half_precision: bool) -> Option<(Device, DType)> {
    match Device::cuda_if_available(0) {
        Ok(device) if device.is_cuda() => {
            let dtype = if half_precision { DType::BF16 } else { DType::F32 };
            Some((device, dtype))
        }
        Ok(_) => {
            log::warn!("CUDA not available, defaulting to CPU");
            None
        }
        Err(e) => {
            log::warn!("CUDA not available, defaulting to CPU: {e}");
            None
        }
    }
}

#[cfg(all(feature = "metal", not(feature = "cuda")))]
fn accelerator(half_precision: bool) -> Option<(Device, DType)> {
    match Device::new_metal(0) {
        Ok(device) => {
            let dtype = if half_precision { DType::F16 } else { DType::F32 };
            Some((device, dtype))
        }
        Err(e) => {
            log::warn!("Metal not available, defaulting to CPU: {e}");
            None
        }
    }
}

#[cfg(not(any(feature = "cuda", feature = "metal")))]
fn accelerator(_half_precision: bool) -> Option<(Device, DType)> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(any(feature = "cuda", feature = "metal")))]
    #[test]
    fn cpu_build_uses_f32() {
        for half in [false, true] {
            let (device, dtype) = select_device(half);
            assert!(device.is_cpu());
            assert_eq!(dtype, DType::F32);
        }
    }
}
