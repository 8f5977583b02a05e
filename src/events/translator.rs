use crate::events::{MessageKind, RawMessage, SubWindowEvent};
use crate::types::{Point, Size};

/// 一条消息被观察后的结果
///
/// 翻译器只观察消息、从不拦截：无论结果如何，消息之后都要交给默认窗口过程。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// 位置变化，更新缓存
    Moved(Point),
    /// 尺寸变化，更新缓存
    Resized(Size),
    /// 需要转发给宿主的输入事件
    Input(SubWindowEvent),
    /// 未识别的消息
    Ignored,
}

fn loword(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/// 等价于 `GET_X_LPARAM`（带符号，多显示器下可能为负）
pub fn x_from_lparam(lparam: isize) -> i32 {
    loword(lparam as usize) as i16 as i32
}

/// 等价于 `GET_Y_LPARAM`
pub fn y_from_lparam(lparam: isize) -> i32 {
    hiword(lparam as usize) as i16 as i32
}

/// 从 `WM_MOVE` 的 lParam 解出客户区左上角位置
pub fn point_from_lparam(lparam: isize) -> Point {
    Point::new(x_from_lparam(lparam), y_from_lparam(lparam))
}

/// 从 `WM_SIZE` 的 lParam 解出客户区尺寸（无符号）
pub fn size_from_lparam(lparam: isize) -> Size {
    let value = lparam as usize;
    Size::new(loword(value) as i32, hiword(value) as i32)
}

/// 把两个 16 位值打包为 lParam（`MAKELPARAM`）
pub fn make_lparam(low: i32, high: i32) -> isize {
    (((high as u16 as u32) << 16) | (low as u16 as u32)) as i32 as isize
}

/// 把原始窗口消息翻译为观察结果
pub fn translate(index: usize, message: RawMessage) -> Observation {
    let Some(kind) = message.kind() else {
        return Observation::Ignored;
    };

    let mut event = SubWindowEvent {
        index: index as i32,
        msg: message.msg,
        ..Default::default()
    };

    match kind {
        MessageKind::Move => Observation::Moved(point_from_lparam(message.lparam)),
        MessageKind::Size => Observation::Resized(size_from_lparam(message.lparam)),
        kind if kind.is_keyboard() => {
            event.x = message.wparam as i32;
            Observation::Input(event)
        }
        kind if kind.is_pointer() => {
            event.x = x_from_lparam(message.lparam);
            event.y = y_from_lparam(message.lparam);
            Observation::Input(event)
        }
        MessageKind::MouseWheel => {
            event.x = x_from_lparam(message.lparam);
            event.y = y_from_lparam(message.lparam);
            // GET_KEYSTATE_WPARAM / GET_WHEEL_DELTA_WPARAM
            event.z = loword(message.wparam) as i32;
            event.w = hiword(message.wparam) as i16 as i32;
            Observation::Input(event)
        }
        _ => Observation::Ignored,
    }
}
