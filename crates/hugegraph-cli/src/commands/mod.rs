pub mod wcc;

#[derive(Debug, Clone, Default)]
pub struct OutputContext {
    pub json: bool,
    pub verbose: bool,
}
