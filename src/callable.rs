use core::fmt;
use core::mem;
use core::ptr::NonNull;

/// Opaque pointer-sized payload handed to a work item when it is invoked.
///
/// The scheduler never inspects the payload; it is stored at registration
/// time and passed back verbatim at execution time. Recovering the original
/// type is the receiver's responsibility via [`UserData::as_ref`].
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct UserData(*mut ());

impl UserData {
    /// The empty payload.
    pub const NONE: Self = Self(core::ptr::null_mut());

    /// Wrap a shared reference. The pointee must outlive every invocation
    /// that receives this payload.
    #[must_use]
    pub fn from_ref<T>(value: &T) -> Self {
        Self((value as *const T).cast_mut().cast())
    }

    /// Wrap an exclusive reference. The pointee must outlive every
    /// invocation that receives this payload.
    #[must_use]
    pub fn from_mut<T>(value: &mut T) -> Self {
        Self((value as *mut T).cast())
    }

    /// Raw pointer value of the payload.
    #[must_use]
    pub fn as_ptr(self) -> *mut () {
        self.0
    }

    /// Whether this is the empty payload.
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0.is_null()
    }

    /// Recover a typed reference from the payload.
    ///
    /// Returns `None` for the empty payload.
    ///
    /// # Safety
    ///
    /// A non-null payload must point to a live `T`, created by
    /// [`UserData::from_ref`]/[`UserData::from_mut`] over the same type, and
    /// must remain valid for the lifetime `'a` chosen by the caller. If the
    /// payload crosses threads, `T` must tolerate shared access from that
    /// thread.
    #[must_use]
    pub unsafe fn as_ref<'a, T>(self) -> Option<&'a T> {
        // SAFETY: Forwarded to the caller.
        unsafe { self.0.cast::<T>().as_ref() }
    }
}

// SAFETY: `UserData` is a bare pointer with no operations of its own. Every
// dereference goes through `UserData::as_ref`, whose contract makes the
// caller responsible for liveness and cross-thread validity of the pointee.
unsafe impl Send for UserData {}
// SAFETY: See the `Send` impl above.
unsafe impl Sync for UserData {}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserData({:p})", self.0)
    }
}

/// Trampoline recovering the erased method and instance of a bound callable.
type InstanceShim = unsafe fn(*const (), NonNull<()>, UserData);

#[derive(Clone, Copy)]
enum Binding {
    Unbound,
    Free(fn(UserData)),
    Instance {
        instance: NonNull<()>,
        method: *const (),
        shim: InstanceShim,
    },
}

/// Monomorphized per receiver type; undoes the erasure performed by
/// [`CallableRef::bind_to`].
///
/// # Safety
///
/// - `method` must have been produced by casting a `fn(&T, UserData)` for
///   this exact `T`.
/// - `instance` must point to a live `T`.
unsafe fn instance_shim<T>(method: *const (), instance: NonNull<()>, data: UserData) {
    // SAFETY: Round-trip of the cast performed in `bind_to`; the pointer was
    // created from a function pointer of exactly this type.
    let method = unsafe { mem::transmute::<*const (), fn(&T, UserData)>(method) };
    // SAFETY: `instance` was created from `&T` in `bind_to` and the caller
    // guarantees it is still live.
    let instance = unsafe { instance.cast::<T>().as_ref() };
    method(instance, data);
}

/// Fixed-size, non-owning, type-erased handle to a unit of work.
///
/// A `CallableRef` wraps either a free function of signature `fn(UserData)`
/// or an `(instance, method)` pair with the same signature, and invokes
/// either through one uniform call site. It performs no heap allocation, is
/// `Copy`, and does not own the instance it is bound to.
///
/// Rebinding overwrites the previous target. A default-constructed value is
/// unbound; invoking it is a programming error and aborts via panic rather
/// than being reported as a recoverable condition.
#[derive(Clone, Copy)]
#[must_use]
pub struct CallableRef {
    binding: Binding,
}

impl CallableRef {
    /// An unbound callable. Must be bound before the first invocation.
    pub const fn unbound() -> Self {
        Self {
            binding: Binding::Unbound,
        }
    }

    /// A callable bound to a free function.
    pub fn new(function: fn(UserData)) -> Self {
        Self {
            binding: Binding::Free(function),
        }
    }

    /// A callable bound to `method` invoked on `instance`.
    ///
    /// # Safety
    ///
    /// The instance pointer is held with its lifetime erased: `instance`
    /// must outlive every invocation of the returned value, including
    /// invocations made from worker threads. If the callable crosses
    /// threads, `&T` access from those threads must be sound (`T: Sync`).
    pub unsafe fn bound<T>(instance: &T, method: fn(&T, UserData)) -> Self {
        let mut callable = Self::unbound();
        // SAFETY: Forwarded to the caller.
        unsafe { callable.bind_to(instance, method) };
        callable
    }

    /// Rebind to a free function, overwriting any prior binding.
    pub fn bind(&mut self, function: fn(UserData)) {
        self.binding = Binding::Free(function);
    }

    /// Rebind to `method` invoked on `instance`, overwriting any prior
    /// binding.
    ///
    /// # Safety
    ///
    /// Same contract as [`CallableRef::bound`].
    pub unsafe fn bind_to<T>(&mut self, instance: &T, method: fn(&T, UserData)) {
        self.binding = Binding::Instance {
            instance: NonNull::from(instance).cast(),
            method: method as *const (),
            shim: instance_shim::<T>,
        };
    }

    /// Whether the callable is bound to an `(instance, method)` pair.
    #[must_use]
    pub fn is_bound_to_instance(&self) -> bool {
        matches!(self.binding, Binding::Instance { .. })
    }

    /// Whether the callable is bound to a free function.
    #[must_use]
    pub fn is_free_function(&self) -> bool {
        matches!(self.binding, Binding::Free(_))
    }

    /// Whether any target is bound, free function or instance method alike.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        !matches!(self.binding, Binding::Unbound)
    }

    /// Dispatch to the bound target.
    ///
    /// # Panics
    ///
    /// Panics if the callable is unbound. This is a violated precondition,
    /// not a runtime condition to recover from; callers must never invoke a
    /// default-constructed value.
    pub fn invoke(&self, data: UserData) {
        match self.binding {
            Binding::Free(function) => function(data),
            Binding::Instance {
                instance,
                method,
                shim,
            } => {
                // SAFETY: `method`/`instance` were erased together in
                // `bind_to` for the `T` that `shim` was monomorphized over,
                // and the binding contract guarantees the instance is live.
                unsafe { shim(method, instance, data) }
            }
            Binding::Unbound => panic!("CallableRef::invoke: no target is bound"),
        }
    }
}

impl Default for CallableRef {
    fn default() -> Self {
        Self::unbound()
    }
}

impl From<fn(UserData)> for CallableRef {
    fn from(function: fn(UserData)) -> Self {
        Self::new(function)
    }
}

// SAFETY: A bound callable holds at most one erased instance pointer. The
// binding contract (`CallableRef::bound`/`bind_to`) requires the instance to
// be live and shareable across any thread that may invoke the callable, so
// moving the handle itself between threads adds nothing.
unsafe impl Send for CallableRef {}
// SAFETY: See the `Send` impl above. `invoke` takes `&self` and only ever
// produces `&T` access to the bound instance.
unsafe impl Sync for CallableRef {}

impl fmt::Debug for CallableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.binding {
            Binding::Unbound => "unbound",
            Binding::Free(_) => "free function",
            Binding::Instance { .. } => "instance method",
        };
        write!(f, "CallableRef({target})")
    }
}
