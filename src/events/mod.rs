mod translator;

pub use translator::*;

use crate::types::{Point, Size};

/// 窗口消息编号（与 Win32 `WM_*` 数值一致，宿主可以直接比较）
pub mod codes {
    pub const WM_MOVE: u32 = 0x0003;
    pub const WM_SIZE: u32 = 0x0005;
    pub const WM_KEYDOWN: u32 = 0x0100;
    pub const WM_KEYUP: u32 = 0x0101;
    pub const WM_CHAR: u32 = 0x0102;
    pub const WM_MOUSEMOVE: u32 = 0x0200;
    pub const WM_LBUTTONDOWN: u32 = 0x0201;
    pub const WM_LBUTTONUP: u32 = 0x0202;
    pub const WM_RBUTTONDOWN: u32 = 0x0204;
    pub const WM_RBUTTONUP: u32 = 0x0205;
    pub const WM_MBUTTONDOWN: u32 = 0x0207;
    pub const WM_MBUTTONUP: u32 = 0x0208;
    pub const WM_MOUSEWHEEL: u32 = 0x020A;
    pub const WM_IME_CHAR: u32 = 0x0286;
}

/// 翻译器识别的消息种类
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Move = codes::WM_MOVE,
    Size = codes::WM_SIZE,
    KeyDown = codes::WM_KEYDOWN,
    KeyUp = codes::WM_KEYUP,
    Char = codes::WM_CHAR,
    ImeChar = codes::WM_IME_CHAR,
    MouseMove = codes::WM_MOUSEMOVE,
    LeftButtonDown = codes::WM_LBUTTONDOWN,
    LeftButtonUp = codes::WM_LBUTTONUP,
    RightButtonDown = codes::WM_RBUTTONDOWN,
    RightButtonUp = codes::WM_RBUTTONUP,
    MiddleButtonDown = codes::WM_MBUTTONDOWN,
    MiddleButtonUp = codes::WM_MBUTTONUP,
    MouseWheel = codes::WM_MOUSEWHEEL,
}

impl MessageKind {
    pub fn from_raw(msg: u32) -> Option<Self> {
        let kind = match msg {
            codes::WM_MOVE => MessageKind::Move,
            codes::WM_SIZE => MessageKind::Size,
            codes::WM_KEYDOWN => MessageKind::KeyDown,
            codes::WM_KEYUP => MessageKind::KeyUp,
            codes::WM_CHAR => MessageKind::Char,
            codes::WM_IME_CHAR => MessageKind::ImeChar,
            codes::WM_MOUSEMOVE => MessageKind::MouseMove,
            codes::WM_LBUTTONDOWN => MessageKind::LeftButtonDown,
            codes::WM_LBUTTONUP => MessageKind::LeftButtonUp,
            codes::WM_RBUTTONDOWN => MessageKind::RightButtonDown,
            codes::WM_RBUTTONUP => MessageKind::RightButtonUp,
            codes::WM_MBUTTONDOWN => MessageKind::MiddleButtonDown,
            codes::WM_MBUTTONUP => MessageKind::MiddleButtonUp,
            codes::WM_MOUSEWHEEL => MessageKind::MouseWheel,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_raw(self) -> u32 {
        self as u32
    }

    pub fn is_keyboard(self) -> bool {
        matches!(self,
            MessageKind::KeyDown |
            MessageKind::KeyUp |
            MessageKind::Char |
            MessageKind::ImeChar
        )
    }

    pub fn is_pointer(self) -> bool {
        matches!(self,
            MessageKind::MouseMove |
            MessageKind::LeftButtonDown |
            MessageKind::LeftButtonUp |
            MessageKind::RightButtonDown |
            MessageKind::RightButtonUp |
            MessageKind::MiddleButtonDown |
            MessageKind::MiddleButtonUp
        )
    }
}

/// 窗口过程收到的原始消息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl RawMessage {
    pub fn new(msg: u32, wparam: usize, lparam: isize) -> Self {
        Self { msg, wparam, lparam }
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_raw(self.msg)
    }
}

/// 子窗口输入事件记录
///
/// 布局与 C 侧的 `{ int index; UINT msg; int x, y, z, w; }` 一致，按值传给回调。
/// 字段含义取决于 `msg`：
/// - 键盘/字符消息：`x` 为键码或字符码
/// - 指针消息：`x`、`y` 为坐标
/// - 滚轮消息：`x`、`y` 为坐标，`z` 为修饰键状态，`w` 为带符号的滚轮增量
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubWindowEvent {
    pub index: i32,
    pub msg: u32,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
}

impl SubWindowEvent {
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_raw(self.msg)
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// 子窗口事件订阅接口，由宿主实现
///
/// 在创建子窗口时注册、销毁时注销。所有方法都在 UI 线程的消息分发过程中同步调用，
/// 不能长时间阻塞。
pub trait SubWindowListener {
    /// 子窗口位置变化（缓存已经更新）
    fn on_move(&self, _index: usize, _position: Point) {}

    /// 子窗口尺寸变化（缓存已经更新）
    fn on_resize(&self, _index: usize, _size: Size) {}

    /// 输入事件
    fn on_input(&self, event: SubWindowEvent);
}

impl<F> SubWindowListener for F
where
    F: Fn(SubWindowEvent),
{
    fn on_input(&self, event: SubWindowEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_round_trip_for_known_codes() {
        assert_eq!(MessageKind::from_raw(0x0201), Some(MessageKind::LeftButtonDown));
        assert_eq!(MessageKind::MouseWheel.as_raw(), 0x020A);
        assert_eq!(MessageKind::from_raw(0x0010), None);
    }

    #[test]
    fn test_message_kind_classification() {
        assert!(MessageKind::ImeChar.is_keyboard());
        assert!(MessageKind::MiddleButtonUp.is_pointer());
        assert!(!MessageKind::MouseWheel.is_pointer());
        assert!(!MessageKind::Move.is_keyboard());
    }

    #[test]
    fn test_event_layout_matches_c_record() {
        assert_eq!(std::mem::size_of::<SubWindowEvent>(), 24);
        assert_eq!(std::mem::size_of::<Point>(), 8);
    }

    #[test]
    fn test_closure_listener() {
        use std::cell::RefCell;

        let received = RefCell::new(Vec::new());
        let listener = |event: SubWindowEvent| received.borrow_mut().push(event);
        listener.on_input(SubWindowEvent { index: 3, ..Default::default() });
        listener.on_move(3, Point::new(1, 2));

        assert_eq!(received.borrow().len(), 1);
        assert_eq!(received.borrow()[0].index, 3);
    }
}
