//! Elements whose locator is computed at call time.
//!
//! A dynamic descriptor holds a function from runtime arguments to a [`Locator`]. Every
//! call builds a fresh locator and resolves it independently: the result is never cached on
//! the page, so calls with different arguments cannot see each other's handles.
//!
//! ```no_run
//! use thirtyfour_pages::prelude::*;
//!
//! struct Inbox {
//!     page: Page,
//! }
//!
//! impl PageObject for Inbox {
//!     fn page(&self) -> &Page {
//!         &self.page
//!     }
//! }
//!
//! impl Inbox {
//!     const MESSAGE: DynamicElement<usize> = DynamicElement::new("message", |n| {
//!         Locator::builder(By::Css, format!("#inbox li:nth-child({})", n + 1)).build()
//!     });
//!
//!     fn open(&self, n: usize) -> PageResult<()> {
//!         Self::MESSAGE.get(self, n)?.click()?;
//!         Ok(())
//!     }
//! }
//! ```
use std::fmt;

use log::debug;

use crate::element::ElementRef;
use crate::elements::ElementsRef;
use crate::error::PageResult;
use crate::locator::{IntoLocator, Locator};
use crate::page::{Bound, Page, PageObject};

/// Builds a locator from runtime arguments.
pub type LocatorFn<A> = fn(A) -> PageResult<Locator>;

/// A single element located from runtime arguments.
pub struct DynamicElement<A> {
    attribute: &'static str,
    build: LocatorFn<A>,
}

impl<A> DynamicElement<A> {
    pub const fn new(attribute: &'static str, build: LocatorFn<A>) -> Self {
        Self {
            attribute,
            build,
        }
    }

    pub const fn attribute(&self) -> &'static str {
        self.attribute
    }

    /// Build the locator for `args` without resolving anything.
    pub fn locator(&self, args: A) -> PageResult<Locator> {
        (self.build)(args)
    }

    /// Build the locator for `args` and bind it to `owner` for this call only.
    pub fn get<'p, P: PageObject + ?Sized>(&self, owner: &'p P, args: A) -> PageResult<ElementRef<'p>> {
        let locator = (self.build)(args)?;
        debug!("{}: {} built {}", owner.page().id(), self.attribute, locator);
        Ok(ElementRef::new(Bound::call_scoped(owner.page(), self.attribute, locator)))
    }
}

/// Every element matching a locator built from runtime arguments.
pub struct DynamicElements<A> {
    attribute: &'static str,
    build: LocatorFn<A>,
}

impl<A> DynamicElements<A> {
    pub const fn new(attribute: &'static str, build: LocatorFn<A>) -> Self {
        Self {
            attribute,
            build,
        }
    }

    pub const fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn locator(&self, args: A) -> PageResult<Locator> {
        (self.build)(args)
    }

    pub fn get<'p, P: PageObject + ?Sized>(&self, owner: &'p P, args: A) -> PageResult<ElementsRef<'p>> {
        let locator = (self.build)(args)?;
        debug!("{}: {} built {}", owner.page().id(), self.attribute, locator);
        Ok(ElementsRef::new(Bound::call_scoped(owner.page(), self.attribute, locator)))
    }
}

// Not derived: `A` does not have to be Clone or Debug.
impl<A> Clone for DynamicElement<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for DynamicElement<A> {}

impl<A> fmt::Debug for DynamicElement<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DynamicElement").field("attribute", &self.attribute).finish()
    }
}

impl<A> Clone for DynamicElements<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for DynamicElements<A> {}

impl<A> fmt::Debug for DynamicElements<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DynamicElements").field("attribute", &self.attribute).finish()
    }
}

impl Page {
    /// An ad hoc element, resolved independently of any declared attribute.
    pub fn dynamic_element<L: IntoLocator>(
        &self,
        attribute: &'static str,
        locator: L,
    ) -> PageResult<ElementRef<'_>> {
        Ok(ElementRef::new(Bound::call_scoped(self, attribute, locator.into_locator()?)))
    }

    /// Ad hoc elements, resolved independently of any declared attribute.
    pub fn dynamic_elements<L: IntoLocator>(
        &self,
        attribute: &'static str,
        locator: L,
    ) -> PageResult<ElementsRef<'_>> {
        Ok(ElementsRef::new(Bound::call_scoped(self, attribute, locator.into_locator()?)))
    }
}
