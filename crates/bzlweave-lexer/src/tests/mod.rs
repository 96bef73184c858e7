mod layout;
mod mock;
mod strings;

pub(crate) use mock::TokenMock;
