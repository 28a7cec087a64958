mod challenger;
mod outcome;
