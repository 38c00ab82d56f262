use std::cell::RefCell;
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;

use crate::error::RuntimeError;

/// Shared handle to a single array allocation.
///
/// Cells start out empty; a read of a never-written index yields the
/// element type's empty value. Cloning the handle shares the underlying
/// storage, so a duplicated reference observes later writes. The storage
/// is released when the last handle is dropped.
pub struct ArrayRef<T> {
    cells: Rc<RefCell<Vec<Option<T>>>>,
}

impl<T: Copy> ArrayRef<T> {
    pub fn allocate(size: i64) -> Result<Self, RuntimeError> {
        if size < 1 {
            return Err(RuntimeError::ArraySize(size));
        }
        Ok(ArrayRef {
            cells: Rc::new(RefCell::new(vec![None; size as usize])),
        })
    }

    pub fn get(&self, index: i64) -> Result<Option<T>, RuntimeError> {
        let cells = self.cells.borrow();
        if index < 0 || index as usize >= cells.len() {
            return Err(RuntimeError::ArrayIndex {
                index,
                length: cells.len(),
            });
        }
        Ok(cells[index as usize])
    }

    pub fn set(&self, index: i64, value: Option<T>) -> Result<(), RuntimeError> {
        let mut cells = self.cells.borrow_mut();
        if index < 0 || index as usize >= cells.len() {
            return Err(RuntimeError::ArrayIndex {
                index,
                length: cells.len(),
            });
        }
        cells[index as usize] = value;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when both handles refer to the same allocation.
    pub fn ptr_eq(&self, other: &ArrayRef<T>) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }

    pub fn to_vec(&self) -> Vec<Option<T>> {
        self.cells.borrow().clone()
    }
}

impl<T> Clone for ArrayRef<T> {
    fn clone(&self) -> Self {
        ArrayRef {
            cells: Rc::clone(&self.cells),
        }
    }
}

impl<T: Copy> From<Vec<T>> for ArrayRef<T> {
    fn from(values: Vec<T>) -> Self {
        ArrayRef {
            cells: Rc::new(RefCell::new(values.into_iter().map(Some).collect())),
        }
    }
}

impl<T: PartialEq> PartialEq for ArrayRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells) || self.cells.borrow().eq(&*other.cells.borrow())
    }
}

impl<T: Display> Display for ArrayRef<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, cell) in self.cells.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match cell {
                Some(v) => write!(f, "{}", v)?,
                None => write!(f, "none")?,
            }
        }
        write!(f, "]")
    }
}

impl<T: Display> Debug for ArrayRef<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}
