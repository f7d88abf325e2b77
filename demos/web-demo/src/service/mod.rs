// Demo service layer

use trellis::{Describe, register_component};

/// Lookup operations the web controller delegates to
pub trait QueryService: Send + Sync {
    fn get(&self, name: &str) -> String;
}

#[derive(Debug, Default)]
pub struct QueryServiceImpl;

impl QueryService for QueryServiceImpl {
    fn get(&self, name: &str) -> String {
        format!("My name is {}", name)
    }
}

register_component!(QueryServiceImpl, || {
    Describe::<QueryServiceImpl>::new()
        .service("")
        .constructor(QueryServiceImpl::default)
        .implements::<dyn QueryService>(|it| it)
        .build()
});
