use vergen_gitcl::{Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only what `src/version.rs` reads. Outside a git checkout vergen emits
    // placeholder values instead of failing.
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();
    Emitter::default().add_instructions(&gitcl)?.emit()?;
    Ok(())
}
