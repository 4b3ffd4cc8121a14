/// Declares a service interface.
///
/// Generates, from one declaration:
///
/// - the interface trait, with `binding`, `is_foreign` and `on_connect`
///   alongside the declared operations;
/// - an [`Interface`](crate::Interface) impl for `dyn Trait`, including the
///   operation table;
/// - the `entry` newtype, the erased [`Service`](crate::Service) view that
///   decodes arguments and calls the trait;
/// - the `proxy` struct, which implements the trait by sending `INVOKE`s.
///
/// Operation ids are given explicitly and must stay stable for the lifetime
/// of the interface. Every operation takes a [`CallContext`](crate::CallContext)
/// and returns `Result<()>`; results flow back through
/// [`Callback`](crate::Callback) arguments.
///
/// ```
/// use std::sync::Arc;
/// use svcrpc::{service, Binding, CallContext, Callback, Result};
///
/// service! {
///     /// Writes text somewhere.
///     pub trait Printer {
///         proxy PrinterProxy;
///         entry PrinterEntry;
///
///         fn print(&self, cx: &CallContext, text: String, done: Callback<()>) -> Result<()> = 0;
///     }
/// }
///
/// struct Stdout {
///     binding: Binding,
/// }
///
/// impl Printer for Stdout {
///     fn binding(&self) -> &Binding {
///         &self.binding
///     }
///
///     fn print(&self, _cx: &CallContext, text: String, done: Callback<()>) -> Result<()> {
///         println!("{}", text);
///         done.call(())
///     }
/// }
///
/// let printer: Arc<dyn Printer> = Arc::new(Stdout { binding: Binding::new() });
/// printer.print(&CallContext::local(), "hello".into(), Callback::new(|_, ()| {})).unwrap();
/// ```
#[macro_export]
macro_rules! service {
    (
        $(#[$meta:meta])*
        $vis:vis trait $name:ident {
            proxy $proxy:ident;
            entry $entry:ident;

            $(
                $(#[$op_meta:meta])*
                fn $method:ident(&self, $cx:ident: &CallContext $(, $arg:ident: $ty:ty)*) -> Result<()> = $op:literal;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis trait $name: ::core::marker::Send + ::core::marker::Sync + 'static {
            /// The owner attachment of this instance.
            fn binding(&self) -> &$crate::Binding;

            fn is_foreign(&self) -> bool {
                false
            }

            /// Called when a peer connects to this instance by name.
            fn on_connect(&self, cx: &$crate::CallContext) {
                let _ = cx;
            }

            $(
                $(#[$op_meta])*
                fn $method(&self, $cx: &$crate::CallContext $(, $arg: $ty)*) -> $crate::Result<()>;
            )*
        }

        impl $crate::Interface for dyn $name {
            fn descriptor() -> &'static $crate::Descriptor {
                static DESCRIPTOR: $crate::Descriptor = $crate::Descriptor {
                    name: ::core::stringify!($name),
                    operations: &[
                        $(
                            $crate::Operation {
                                id: $op,
                                name: ::core::stringify!($method),
                                signature: ::core::stringify!($($arg: $ty),*),
                            },
                        )*
                    ],
                };
                &DESCRIPTOR
            }

            fn binding(this: &Self) -> &$crate::Binding {
                $name::binding(this)
            }

            fn entry(this: ::std::sync::Arc<Self>) -> ::std::sync::Arc<dyn $crate::Service> {
                ::std::sync::Arc::new($entry(this))
            }

            fn proxy(remote: $crate::Remote) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new($proxy {
                    remote,
                    binding: $crate::Binding::new(),
                })
            }
        }

        #[doc = ::core::concat!("Dispatch entry for `", ::core::stringify!($name), "` instances.")]
        $vis struct $entry(pub ::std::sync::Arc<dyn $name>);

        impl $crate::Service for $entry {
            fn binding(&self) -> &$crate::Binding {
                self.0.binding()
            }

            fn descriptor(&self) -> &'static $crate::Descriptor {
                <dyn $name as $crate::Interface>::descriptor()
            }

            fn is_foreign(&self) -> bool {
                self.0.is_foreign()
            }

            fn on_connect(&self, cx: &$crate::CallContext) {
                self.0.on_connect(cx)
            }

            fn invoke(
                &self,
                cx: &$crate::CallContext,
                op: $crate::OpId,
                args: &mut $crate::ArgReader<'_>,
            ) -> $crate::Result<$crate::Dispatch> {
                let _ = (&cx, &args);
                match op {
                    $(
                        $op => {
                            $( let $arg = <$ty as $crate::Marshal>::decode(args)?; )*
                            self.0.$method(cx $(, $arg)*)?;
                            Ok($crate::Dispatch::Handled)
                        }
                    )*
                    _ => Ok($crate::Dispatch::NotHandled),
                }
            }
        }

        #[doc = ::core::concat!("Forwards `", ::core::stringify!($name), "` calls to a remote instance.")]
        $vis struct $proxy {
            remote: $crate::Remote,
            binding: $crate::Binding,
        }

        impl $name for $proxy {
            fn binding(&self) -> &$crate::Binding {
                &self.binding
            }

            fn is_foreign(&self) -> bool {
                true
            }

            $(
                fn $method(&self, $cx: &$crate::CallContext $(, $arg: $ty)*) -> $crate::Result<()> {
                    let _ = $cx;
                    self.remote.invoke(&self.binding, $op, move |_w| {
                        $( <$ty as $crate::Marshal>::encode($arg, _w)?; )*
                        Ok(())
                    })
                }
            )*
        }
    };
}
