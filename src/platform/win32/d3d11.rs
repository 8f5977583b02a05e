use std::ptr;

use tracing::debug;
use windows::Win32::Foundation::{HMODULE, HWND};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::core::Interface;

use crate::errors::{SubWindowError, SubWindowResult};
use crate::platform::PresentSurface;
use crate::types::{Size, TextureHandle};

/// 绑定到子窗口的 D3D11 设备、设备上下文和交换链
///
/// 字段按释放顺序声明：上下文、交换链、设备。
pub struct D3D11Surface {
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain,
    device: ID3D11Device,
}

// SAFETY: 表面创建后只移交给一个呈现线程独占使用，join 后才回到 UI 线程释放，
// 任何时刻都只有一个线程接触这些 COM 对象。
unsafe impl Send for D3D11Surface {}

impl D3D11Surface {
    /// 为窗口创建硬件设备和单缓冲交换链
    pub fn create(hwnd: HWND, size: Size) -> SubWindowResult<Self> {
        let desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: size.width.max(0) as u32,
                Height: size.height.max(0) as u32,
                Format: DXGI_FORMAT_R8G8B8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: hwnd,
            Windowed: true.into(),
            ..Default::default()
        };

        let mut swap_chain = None;
        let mut device = None;
        let mut context = None;

        unsafe {
            D3D11CreateDeviceAndSwapChain(
                None,
                D3D_DRIVER_TYPE_HARDWARE,
                HMODULE(ptr::null_mut()),
                D3D11_CREATE_DEVICE_FLAG(0),
                None,
                D3D11_SDK_VERSION,
                Some(&desc),
                Some(&mut swap_chain),
                Some(&mut device),
                None,
                Some(&mut context),
            )
        }
        .map_err(|e| SubWindowError::DeviceCreation(e.to_string()))?;

        let (Some(swap_chain), Some(device), Some(context)) = (swap_chain, device, context) else {
            return Err(SubWindowError::DeviceCreation("设备或交换链为空".into()));
        };

        debug!("已为窗口 {:?} 创建交换链 {}x{}", hwnd.0, size.width, size.height);
        Ok(Self {
            context,
            swap_chain,
            device,
        })
    }
}

impl PresentSurface for D3D11Surface {
    type BackBuffer = ID3D11Texture2D;

    fn acquire_back_buffer(&mut self) -> SubWindowResult<ID3D11Texture2D> {
        unsafe { self.swap_chain.GetBuffer::<ID3D11Texture2D>(0) }
            .map_err(|e| SubWindowError::BackBuffer(e.to_string()))
    }

    fn copy_and_present(
        &mut self,
        back_buffer: &ID3D11Texture2D,
        source: TextureHandle,
    ) -> SubWindowResult<()> {
        let pointer = source.as_raw();
        // SAFETY: 调用方保证纹理在子窗口销毁前有效；这里只借用，不增加引用计数
        let source = unsafe { ID3D11Texture2D::from_raw_borrowed(&pointer) }
            .ok_or_else(|| SubWindowError::Present("源纹理为空".into()))?;

        unsafe {
            self.context.CopyResource(back_buffer, source);
            self.swap_chain
                .Present(1, DXGI_PRESENT(0))
                .ok()
                .map_err(|e| SubWindowError::Present(e.to_string()))
        }
    }

    fn release(self) {
        let Self {
            context,
            swap_chain,
            device,
        } = self;

        unsafe {
            context.ClearState();
            context.Flush();
        }
        drop(context);
        drop(swap_chain);
        drop(device);
    }
}
