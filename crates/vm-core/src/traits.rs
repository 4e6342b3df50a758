/// A node driven by the render host once per audio block.
///
/// `inputs` is indexed input → channel → samples. A node with nothing
/// connected receives an empty slice, and a connected but silent input may
/// carry zero channels.
///
/// The return value is the keep-alive flag: `true` asks the host to keep
/// calling, `false` lets the host retire the node for good.
///
/// # Example
/// ```
/// use vm_core::traits::AudioProcessor;
///
/// struct Passthrough;
/// impl AudioProcessor for Passthrough {
///     fn process(&mut self, _inputs: &[&[&[f32]]]) -> bool { true }
///     fn name(&self) -> &'static str { "passthrough" }
/// }
///
/// let mut node = Passthrough;
/// assert!(node.process(&[]));
/// ```
pub trait AudioProcessor: Send + 'static {
    /// Traite un bloc. Appelé sur le thread audio temps réel.
    ///
    /// CONTRAT : ne doit PAS allouer, verrouiller, ni bloquer.
    fn process(&mut self, inputs: &[&[&[f32]]]) -> bool;

    /// Registered name, for logs.
    fn name(&self) -> &'static str;
}
