use std::cell::RefCell;
use std::rc::Rc;
use stereogram_engine::depth::{depth_capture_supported, Disposable, TargetSlot};
use stereogram_engine::DepthCapture;

/// Stands in for a GPU target; logs its lifecycle into a shared journal.
struct FakeTarget {
    id: usize,
    journal: Rc<RefCell<Vec<String>>>,
    live: Rc<RefCell<usize>>,
}

impl FakeTarget {
    fn allocate(id: usize, journal: &Rc<RefCell<Vec<String>>>, live: &Rc<RefCell<usize>>) -> Self {
        journal.borrow_mut().push(format!("alloc {id}"));
        *live.borrow_mut() += 1;
        Self {
            id,
            journal: journal.clone(),
            live: live.clone(),
        }
    }
}

impl Disposable for FakeTarget {
    fn dispose(&mut self) {
        self.journal.borrow_mut().push(format!("dispose {}", self.id));
        *self.live.borrow_mut() -= 1;
    }
}

#[test]
fn rebuilds_keep_a_single_live_target() {
    let journal = Rc::new(RefCell::new(Vec::new()));
    let live = Rc::new(RefCell::new(0));

    let mut slot = TargetSlot::new(|| FakeTarget::allocate(0, &journal, &live));
    for id in 1..=5 {
        slot.rebuild(|| FakeTarget::allocate(id, &journal, &live));
        assert_eq!(slot.live(), 1);
        assert_eq!(*live.borrow(), 1);
    }
    assert_eq!(slot.allocations(), 6);
    assert_eq!(slot.current().id, 5);
}

#[test]
fn old_target_is_released_before_the_new_one_exists() {
    let journal = Rc::new(RefCell::new(Vec::new()));
    let live = Rc::new(RefCell::new(0));

    let mut slot = TargetSlot::new(|| FakeTarget::allocate(0, &journal, &live));
    slot.rebuild(|| FakeTarget::allocate(1, &journal, &live));
    slot.rebuild(|| FakeTarget::allocate(2, &journal, &live));

    assert_eq!(
        *journal.borrow(),
        ["alloc 0", "dispose 0", "alloc 1", "dispose 1", "alloc 2"]
    );
}

#[test]
fn depth_format_needs_render_sample_and_copy() {
    let full = wgpu::TextureFormatFeatures {
        allowed_usages: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        flags: wgpu::TextureFormatFeatureFlags::empty(),
    };
    assert!(depth_capture_supported(&full));

    let render_only = wgpu::TextureFormatFeatures {
        allowed_usages: wgpu::TextureUsages::RENDER_ATTACHMENT,
        flags: wgpu::TextureFormatFeatureFlags::empty(),
    };
    assert!(!depth_capture_supported(&render_only));

    let no_copy = wgpu::TextureFormatFeatures {
        allowed_usages: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING,
        flags: wgpu::TextureFormatFeatureFlags::empty(),
    };
    assert!(!depth_capture_supported(&no_copy));
}

#[test]
fn capture_formats() {
    assert_eq!(DepthCapture::DEPTH_FORMAT, wgpu::TextureFormat::Depth32Float);
    assert!(DepthCapture::DEPTH_FORMAT.has_depth_aspect());
    assert!(!DepthCapture::COLOR_FORMAT.is_srgb());
}
