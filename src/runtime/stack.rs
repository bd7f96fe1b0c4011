use crate::runtime::runtime_error::FaultKind;

type Result<T> = std::result::Result<T, FaultKind>;

/// ## Size limited stack
///
/// Pushing past `capacity` and popping an empty stack are faults; which
/// fault depends on the stack it is used for.
pub struct Stack<T> {
    vec: Vec<T>,
    capacity: usize,
    overflow: FaultKind,
    underflow: FaultKind,
}

impl<T: std::fmt::Debug> std::fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.vec)
    }
}

impl<T: Copy> Stack<T> {
    /// Operand stack flavour.
    pub fn operands(capacity: usize) -> Stack<T> {
        Stack::new(
            capacity,
            FaultKind::StackOverflow { capacity },
            FaultKind::StackUnderflow,
        )
    }

    /// Return address flavour.
    pub fn calls(capacity: usize) -> Stack<T> {
        Stack::new(
            capacity,
            FaultKind::CallStackOverflow { capacity },
            FaultKind::CallStackUnderflow,
        )
    }

    pub fn new(capacity: usize, overflow: FaultKind, underflow: FaultKind) -> Stack<T> {
        Stack {
            vec: Vec::new(),
            capacity,
            overflow,
            underflow,
        }
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }

    pub fn clear(&mut self) {
        self.vec.clear()
    }

    pub fn push(&mut self, val: T) -> Result<()> {
        if self.vec.len() >= self.capacity {
            return Err(self.overflow.clone());
        }
        self.vec.push(val);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<T> {
        self.vec.pop().ok_or_else(|| self.underflow.clone())
    }

    /// Pops two values, returning them in push order.
    pub fn pop_2(&mut self) -> Result<(T, T)> {
        if self.vec.len() < 2 {
            return Err(self.underflow.clone());
        }
        let two = self.pop()?;
        let one = self.pop()?;
        Ok((one, two))
    }

    /// Value `depth` elements below the top; 0 is the top itself.
    pub fn peek(&self, depth: usize) -> Result<T> {
        let len = self.vec.len();
        if depth >= len {
            return Err(self.underflow.clone());
        }
        Ok(self.vec[len - 1 - depth])
    }

    /// Removes `n` elements under the top, keeping the top.
    pub fn slide(&mut self, n: usize) -> Result<()> {
        let len = self.vec.len();
        if n >= len {
            return Err(self.underflow.clone());
        }
        self.vec.drain(len - 1 - n..len - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut s: Stack<i32> = Stack::operands(4);
        s.push(1).unwrap();
        s.push(2).unwrap();
        assert_eq!(s.pop(), Ok(2));
        assert_eq!(s.pop(), Ok(1));
        assert_eq!(s.pop(), Err(FaultKind::StackUnderflow));
    }

    #[test]
    fn test_overflow_at_capacity() {
        let mut s: Stack<usize> = Stack::calls(2);
        s.push(1).unwrap();
        s.push(2).unwrap();
        assert_eq!(s.push(3), Err(FaultKind::CallStackOverflow { capacity: 2 }));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn test_pop_2_order() {
        let mut s: Stack<i32> = Stack::operands(4);
        s.push(10).unwrap();
        s.push(3).unwrap();
        assert_eq!(s.pop_2(), Ok((10, 3)));
        assert!(s.is_empty());
    }

    #[test]
    fn test_pop_2_leaves_single_value() {
        let mut s: Stack<i32> = Stack::operands(4);
        s.push(10).unwrap();
        assert_eq!(s.pop_2(), Err(FaultKind::StackUnderflow));
        assert_eq!(s.as_slice(), &[10]);
    }

    #[test]
    fn test_peek() {
        let mut s: Stack<i32> = Stack::operands(4);
        for v in [1, 2, 3] {
            s.push(v).unwrap();
        }
        assert_eq!(s.peek(0), Ok(3));
        assert_eq!(s.peek(2), Ok(1));
        assert_eq!(s.peek(3), Err(FaultKind::StackUnderflow));
    }

    #[test]
    fn test_slide_keeps_top() {
        let mut s: Stack<i32> = Stack::operands(8);
        for v in [1, 2, 3, 4, 5] {
            s.push(v).unwrap();
        }
        s.slide(3).unwrap();
        assert_eq!(s.as_slice(), &[1, 5]);
        assert_eq!(s.slide(2), Err(FaultKind::StackUnderflow));
        s.slide(0).unwrap();
        assert_eq!(s.as_slice(), &[1, 5]);
    }
}
