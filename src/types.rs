use std::ffi::c_void;
use std::num::NonZeroIsize;
use std::ptr::NonNull;

use serde::{Deserialize, Serialize};

/// 屏幕坐标点
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 窗口尺寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// 窗口位置与尺寸
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Geometry {
    pub origin: Point,
    pub size: Size,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }
}

/// 原生窗口句柄（不透明，非空）
///
/// 只是一个标识值，本身不拥有窗口；窗口的生命周期由创建它的一方负责。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(NonZeroIsize);

impl NativeHandle {
    /// 从原始句柄值创建，空句柄返回 `None`
    pub fn from_raw(raw: isize) -> Option<Self> {
        NonZeroIsize::new(raw).map(Self)
    }

    pub fn as_raw(self) -> isize {
        self.0.get()
    }
}

/// 借用的源纹理句柄（不拥有所有权）
///
/// 指向调用方的 GPU 纹理（Windows 上为 `ID3D11Texture2D*`）。本库从不增加引用、
/// 从不释放，也不假设独占访问。
///
/// # 有效性约定
/// 调用方必须保证纹理在使用它的子窗口被销毁之前一直有效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(NonNull<c_void>);

// SAFETY: 句柄只是一个不透明指针，呈现线程只把它交给图形驱动做拷贝源，
// 跨线程传递的合法性由上面的有效性约定保证。
unsafe impl Send for TextureHandle {}
unsafe impl Sync for TextureHandle {}

impl TextureHandle {
    /// 从原始纹理指针创建，空指针返回 `None`
    ///
    /// # Safety
    /// 指针必须指向一个有效的纹理对象，并在所有使用它的子窗口销毁前保持有效。
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_raw(self) -> *mut c_void {
        self.0.as_ptr()
    }
}
