//! Component configuration
//!
//! Every component is configured by a props struct with documented defaults
//! and a companion patch struct whose fields are all `Option`. A patch is
//! shallow-merged over the props: each `Some` field replaces the current
//! value, each `None` field leaves it alone.
//!
//! The [`props!`](crate::props!) macro declares both at once:
//!
//! ```rust
//! use argo_core::props;
//! use argo_core::props::Props;
//!
//! props! {
//!     /// Label configuration
//!     pub struct LabelProps / LabelPatch {
//!         /// Displayed text
//!         text: String = String::new(),
//!         disabled: bool = false,
//!     }
//! }
//!
//! let mut props = LabelProps::from_patch(LabelPatch::new().text("A"));
//! assert_eq!(props.text, "A");
//! assert!(!props.disabled);
//!
//! props.merge(LabelPatch::new().disabled(true));
//! assert_eq!(props.text, "A");
//! assert!(props.disabled);
//! ```

/// Configuration of a component
pub trait Props: Clone + Default + 'static {
    /// Partial configuration used at construction and by `update`
    type Patch: Default;

    /// Shallow-merge `patch` into `self`
    fn merge(&mut self, patch: Self::Patch);

    /// Defaults with `patch` merged over them
    fn from_patch(patch: Self::Patch) -> Self {
        let mut props = Self::default();
        props.merge(patch);
        props
    }
}

/// Components without configuration
impl Props for () {
    type Patch = ();

    fn merge(&mut self, _patch: ()) {}
}

/// Declare a props struct, its patch struct and their [`Props`] impl
///
/// Fields are written `name: Type = default`. The props struct gets `pub`
/// fields and a `Default` impl built from the defaults; the patch struct gets
/// `Option` fields and one builder method per field.
#[macro_export]
macro_rules! props {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident / $patch:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $default:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl ::std::default::Default for $name {
            fn default() -> Self {
                Self {
                    $( $field: $default, )*
                }
            }
        }

        #[doc = concat!("Partial [`", stringify!($name), "`]; `None` fields are left unchanged")]
        #[derive(Clone, Debug, Default, PartialEq)]
        $vis struct $patch {
            $( pub $field: ::std::option::Option<$ty>, )*
        }

        impl $patch {
            pub fn new() -> Self {
                Self::default()
            }

            $(
                pub fn $field(mut self, value: impl ::std::convert::Into<$ty>) -> Self {
                    self.$field = ::std::option::Option::Some(value.into());
                    self
                }
            )*
        }

        impl $crate::props::Props for $name {
            type Patch = $patch;

            fn merge(&mut self, patch: $patch) {
                $(
                    if let ::std::option::Option::Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::props! {
        pub struct CardProps / CardPatch {
            title: String = "Total".to_string(),
            amount: f64 = 0.0,
            highlighted: bool = false,
        }
    }

    #[test]
    fn test_defaults() {
        let props = CardProps::default();
        assert_eq!(props.title, "Total");
        assert_eq!(props.amount, 0.0);
        assert!(!props.highlighted);
    }

    #[test]
    fn test_merge_only_touches_some_fields() {
        let mut props = CardProps::from_patch(CardPatch::new().title("Grab").amount(12.5));
        props.merge(CardPatch::new().highlighted(true));
        assert_eq!(
            props,
            CardProps {
                title: "Grab".into(),
                amount: 12.5,
                highlighted: true,
            }
        );
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let mut props = CardProps::from_patch(CardPatch::new().amount(3));
        let before = props.clone();
        props.merge(CardPatch::default());
        assert_eq!(props, before);
    }

    #[test]
    fn test_unit_props() {
        let mut unit = <() as Props>::from_patch(());
        unit.merge(());
    }
}
