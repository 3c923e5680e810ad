//! Tri-state wrapper: a value, the false sentinel, or the null sentinel.

/// Which of the three states an [`Optional`] is in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OptionalState {
    HasValue,
    FalseValue,
    #[default]
    NullValue,
}

/// `T`, or one of the two "absent" sentinels.
///
/// The payload slot always holds a valid `T`. While absent it holds the
/// default value, so [`val`](Optional::val) is total. State only changes
/// through the setters and [`ref_mut`](Optional::ref_mut).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Optional<T> {
    value: T,
    state: OptionalState,
}

impl<T: Default> Optional<T> {
    pub fn value(value: T) -> Self {
        Optional {
            value,
            state: OptionalState::HasValue,
        }
    }

    pub fn false_value() -> Self {
        Optional {
            value: T::default(),
            state: OptionalState::FalseValue,
        }
    }

    pub fn null() -> Self {
        Optional {
            value: T::default(),
            state: OptionalState::NullValue,
        }
    }

    /// Take the payload out, leaving the null sentinel.
    pub fn take(&mut self) -> Option<T> {
        let state = std::mem::replace(&mut self.state, OptionalState::NullValue);
        let value = std::mem::take(&mut self.value);
        (state == OptionalState::HasValue).then_some(value)
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        self.state = OptionalState::HasValue;
    }

    pub fn set_false(&mut self) {
        self.value = T::default();
        self.state = OptionalState::FalseValue;
    }

    pub fn set_null(&mut self) {
        self.value = T::default();
        self.state = OptionalState::NullValue;
    }
}

impl<T> Optional<T> {
    pub fn has_value(&self) -> bool {
        self.state == OptionalState::HasValue
    }

    pub fn is_null(&self) -> bool {
        self.state == OptionalState::NullValue
    }

    pub fn is_false(&self) -> bool {
        self.state == OptionalState::FalseValue
    }

    pub fn value_state(&self) -> OptionalState {
        self.state
    }

    /// The payload; the default value while absent.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Mutable payload, leaving the state alone.
    pub fn val_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Mutable payload for writing through; the state becomes has-value.
    pub fn ref_mut(&mut self) -> &mut T {
        self.state = OptionalState::HasValue;
        &mut self.value
    }

    pub fn as_option(&self) -> Option<&T> {
        self.has_value().then_some(&self.value)
    }
}

impl<T> From<T> for Optional<T> {
    fn from(value: T) -> Self {
        Optional {
            value,
            state: OptionalState::HasValue,
        }
    }
}
