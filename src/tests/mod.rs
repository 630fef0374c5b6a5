pub mod common;


#[cfg(test)]
mod test_wild_encounter;

#[cfg(test)]
mod test_alliance;


#[cfg(test)]
mod test_extraction;
