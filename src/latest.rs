use std::{
    cell::{Ref, RefCell},
    mem::replace,
    rc::Rc,
};

use derive_ex::derive_ex;


/// Shared cell holding the current value of a setting read later by a scheduler.
///
/// Cloning shares the same cell. Schedulers that take an accessor, such as
/// [`DelayedInvoke`](crate::DelayedInvoke), observe whatever was last stored
/// at the time they read it, not the value at the time they were created.
#[derive(Default)]
#[derive_ex(Clone, bound())]
pub struct Latest<T: 'static>(Rc<RefCell<T>>);

impl<T: 'static> Latest<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    pub fn replace(&self, value: T) -> T {
        replace(&mut *self.0.borrow_mut(), value)
    }

    /// Calls `f` with the current value.
    pub fn with<U>(&self, f: impl FnOnce(&T) -> U) -> U {
        f(&self.0.borrow())
    }

    /// Returns an accessor that reads the value at the time it is called.
    pub fn getter(&self) -> impl Fn() -> T + 'static
    where
        T: Clone,
    {
        let this = self.clone();
        move || this.get()
    }
}
impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Latest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => std::fmt::Debug::fmt(&*value, f),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
