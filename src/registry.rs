use std::rc::Rc;

use crate::events::SubWindowListener;
use crate::platform::PresentSurface;
use crate::presentation::PresentationThread;
use crate::types::{NativeHandle, Point, Size, TextureHandle};

/// 一个已完整创建的子窗口持有的资源
///
/// 句柄、呈现线程（以及线程里的图形表面）总是一起存在，不会出现半初始化的槽位。
pub struct ActiveWindow<S: PresentSurface> {
    pub handle: NativeHandle,
    pub texture: TextureHandle,
    pub listener: Option<Rc<dyn SubWindowListener>>,
    pub presenter: PresentationThread<S>,
}

/// 槽位状态
pub enum SlotState<S: PresentSurface> {
    Free,
    /// 正在创建或销毁，不可分配，也不可按句柄查到
    Reserved,
    Occupied(ActiveWindow<S>),
}

/// 子窗口槽位
pub struct SubWindowSlot<S: PresentSurface> {
    index: usize,
    pub position: Point,
    pub size: Size,
    state: SlotState<S>,
}

impl<S: PresentSurface> SubWindowSlot<S> {
    fn new(index: usize) -> Self {
        Self {
            index,
            position: Point::ZERO,
            size: Size::default(),
            state: SlotState::Free,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, SlotState::Free)
    }

    pub fn active(&self) -> Option<&ActiveWindow<S>> {
        match &self.state {
            SlotState::Occupied(active) => Some(active),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<NativeHandle> {
        self.active().map(|active| active.handle)
    }

    pub fn listener(&self) -> Option<Rc<dyn SubWindowListener>> {
        self.active().and_then(|active| active.listener.clone())
    }
}

/// 固定容量的子窗口槽位表
pub struct SlotPool<S: PresentSurface> {
    slots: Vec<SubWindowSlot<S>>,
}

impl<S: PresentSurface> SlotPool<S> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(SubWindowSlot::new).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 查找第一个空闲槽位
    pub fn allocate_slot(&self) -> Option<usize> {
        self.slots.iter().position(SubWindowSlot::is_free)
    }

    /// 按原生句柄查找已占用的槽位
    pub fn find_slot(&self, handle: NativeHandle) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.handle() == Some(handle))
    }

    pub fn get(&self, index: usize) -> Option<&SubWindowSlot<S>> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SubWindowSlot<S>> {
        self.slots.get_mut(index)
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.get(index).is_some_and(|slot| slot.active().is_some())
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active().is_some()).count()
    }

    pub fn occupied_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|slot| slot.active().is_some())
            .map(SubWindowSlot::index)
            .collect()
    }

    /// 预留空闲槽位，返回是否成功
    pub fn reserve(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_free() => {
                slot.state = SlotState::Reserved;
                true
            }
            _ => false,
        }
    }

    /// 发布一个完整创建的子窗口
    pub fn occupy(&mut self, index: usize, active: ActiveWindow<S>, position: Point, size: Size) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.position = position;
            slot.size = size;
            slot.state = SlotState::Occupied(active);
        }
    }

    /// 取出已占用槽位的资源，槽位进入预留状态直到 `free`
    pub fn take_active(&mut self, index: usize) -> Option<ActiveWindow<S>> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(&mut slot.state, SlotState::Reserved) {
            SlotState::Occupied(active) => Some(active),
            previous => {
                slot.state = previous;
                None
            }
        }
    }

    /// 清零槽位，使其可以立即被重新分配
    pub fn free(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.position = Point::ZERO;
            slot.size = Size::default();
            slot.state = SlotState::Free;
        }
    }
}
