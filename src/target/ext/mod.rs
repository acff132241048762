//! Extensions to [`Target`](super::Target) which add support for optional
//! capabilities.
//!
//! Each extension is exposed through a `support_` method on `Target`, which
//! returns `Option<FooOps<'_, Self>>`. Targets which implement the extension
//! return `Some(self)`, the rest keep the default `None`.

macro_rules! doc_comment {
    ($x:expr, $($tt:tt)*) => {
        #[doc = $x]
        $($tt)*
    };
}

macro_rules! define_ext {
    ($extname:ident, $exttrait:ident) => {
        doc_comment! {
            concat!("See [`", stringify!($exttrait), "`](trait.", stringify!($exttrait), ".html)."),
            pub type $extname<'a, T> =
                &'a mut dyn $exttrait<Arch = <T as Target>::Arch, Error = <T as Target>::Error>;
        }
    };
}

pub mod breakpoints;
pub mod mmu;
