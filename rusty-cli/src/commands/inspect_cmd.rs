use rusty_host::{load_module, GuestError, ModuleHandle};

use crate::config::ConfigContext;

pub async fn run(module: String, ctx: ConfigContext) -> anyhow::Result<()> {
    let mut handle = load_module(&module, &ctx.config.exports).await?;
    print!("{}", report(&module, &mut handle)?);
    Ok(())
}

/// Initialize the guest and describe what the host sees in it.
pub fn report(source: &str, handle: &mut ModuleHandle) -> anyhow::Result<String> {
    let mut out = String::new();
    out.push_str(&format!("module:    {source}\n"));
    out.push_str(&format!(
        "memory:    {} pages ({} bytes)\n",
        handle.memory_pages(),
        handle.memory_len()
    ));
    let optional = handle.exports().optional_present();
    if optional.is_empty() {
        out.push_str("optional:  none\n");
    } else {
        out.push_str(&format!("optional:  {}\n", optional.join(", ")));
    }

    handle.init()?;
    out.push_str(&format!("vertices:  {}\n", handle.vertex_count()?));
    {
        let state = handle.frame_state()?;
        out.push_str(&format!("view:      {:?}\n", state.view_matrix));
        out.push_str(&format!("data:      {} bytes\n", state.vertex_bytes().len()));
    }

    for (label, text) in [("greeting", handle.greet()), ("motd", handle.motd())] {
        match text {
            Ok(text) => out.push_str(&format!("{label:<10} {text}\n")),
            Err(GuestError::Unsupported(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(out)
}
