use super::types::{
    AdditionalIncomeEvent, AdditionalIncomeKind, ExpensePeriod, IncomePeriod, IrregularExpense,
    SavingsPeriod,
};

/// A rule that applies to an inclusive range of whole-year ages.
pub trait Period {
    fn start_age(&self) -> u32;
    fn end_age(&self) -> u32;

    fn contains(&self, age: u32) -> bool {
        self.start_age() <= age && age <= self.end_age()
    }
}

/// First period in list order whose range contains `age`.
///
/// Overlapping periods are not merged: when two savings (or expense) periods
/// both cover an age, the one listed first wins.
pub fn resolve<P: Period>(periods: &[P], age: u32) -> Option<&P> {
    periods.iter().find(|p| p.contains(age))
}

/// Every period covering `age`, in list order.
pub fn active<P: Period>(periods: &[P], age: u32) -> impl Iterator<Item = &P> {
    periods.iter().filter(move |p| p.contains(age))
}

macro_rules! impl_period {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Period for $ty {
                fn start_age(&self) -> u32 {
                    self.start_age
                }

                fn end_age(&self) -> u32 {
                    self.end_age
                }
            }
        )+
    };
}

impl_period!(IncomePeriod, SavingsPeriod, ExpensePeriod, IrregularExpense);

impl Period for AdditionalIncomeEvent {
    fn start_age(&self) -> u32 {
        match self.kind {
            AdditionalIncomeKind::Annual { start_age, .. } => start_age,
            AdditionalIncomeKind::OneTime { age, .. } => age,
        }
    }

    fn end_age(&self) -> u32 {
        match self.kind {
            AdditionalIncomeKind::Annual { end_age, .. } => end_age,
            AdditionalIncomeKind::OneTime { age, .. } => age,
        }
    }
}
