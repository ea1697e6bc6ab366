use std::io::Write;

use ethers::types::Address;

/// Prints the list of accounts, one checksummed address per line
pub fn write_accounts(
    addresses: &[Address],
    out: &mut impl Write,
) -> eyre::Result<()> {
    for address in addresses {
        writeln!(out, "{}", ethers::utils::to_checksum(address, None))?;
    }

    Ok(())
}
