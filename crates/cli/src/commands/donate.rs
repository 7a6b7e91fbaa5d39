//! Donation intake and pincode lookup commands.

use std::path::PathBuf;

use clap::Args;
use tracing::{info, warn};

use recraft_storefront::services::{DonationImage, IntakeWorkflow, PinStatus};

use super::{CommandError, Context};

/// Fields of the donation form.
#[derive(Args)]
pub struct DonateArgs {
    #[arg(long, default_value = "")]
    donor_name: String,
    /// Material type, e.g. Plastic, Glass, Textile
    #[arg(short, long)]
    material: String,
    /// Quantity or approximate weight, e.g. "3 kg"
    #[arg(short, long)]
    quantity: String,
    /// `clean`, `good`, `broken` or `mixed`
    #[arg(short, long)]
    condition: String,
    /// Photo of the material (repeatable, up to 5)
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,
    #[arg(short, long, default_value = "")]
    notes: String,
    /// Request a doorstep pickup
    #[arg(long)]
    pickup: bool,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, default_value = "")]
    pincode: String,
    #[arg(long, default_value = "")]
    contact: String,
    /// Confirm the material is donated responsibly
    #[arg(long)]
    consent: bool,
}

async fn discard(ctx: &Context, images: &[DonationImage]) {
    for image in images {
        ctx.uploads.discard(&image.reference).await;
    }
}

/// Record a donation.
///
/// With `--pickup` the pincode is checked first and the donation is only
/// recorded if pickup is available there.
///
/// # Errors
///
/// Returns the validation errors of the form, the not-serviceable message,
/// or the error from copying an image.
pub async fn run(ctx: &Context, args: DonateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        match ctx.store_file(path).await {
            Ok(stored) => images.push(DonationImage {
                reference: stored.reference,
                size_bytes: stored.size_bytes,
            }),
            Err(e) => {
                discard(ctx, &images).await;
                return Err(e.into());
            }
        }
    }

    let mut workflow = IntakeWorkflow::new(ctx.store(), &ctx.checker);
    workflow.edit(|form| {
        form.donor_name = args.donor_name;
        form.material_type = args.material;
        form.quantity = args.quantity;
        form.condition = args.condition;
        form.images.clone_from(&images);
        form.notes = args.notes;
        form.pickup = args.pickup;
        form.address = args.address;
        form.pincode = args.pincode;
        form.contact = args.contact;
        form.consent = args.consent;
    });

    if workflow.form().pickup {
        match workflow.check_pincode().await {
            Ok(PinStatus::Serviceable { region, message }) => {
                info!(region = region.as_deref().unwrap_or("-"), "{message}");
            }
            Ok(PinStatus::NotServiceable { message } | PinStatus::Failed { message }) => {
                warn!("{message}");
            }
            // A malformed code is reported with the other field errors by submit.
            Ok(PinStatus::Idle | PinStatus::Checking) | Err(_) => {}
        }
    }

    match workflow.submit().await {
        Ok(donation) => {
            info!(
                donation_id = %donation.id,
                material = %donation.material_type,
                images = donation.images.len(),
                pickup = donation.pickup,
                "Donation recorded"
            );
            Ok(())
        }
        Err(e) => {
            discard(ctx, &images).await;
            Err(e.into())
        }
    }
}

/// Look up pickup serviceability for one pincode.
///
/// # Errors
///
/// Returns `CommandError::Usage` for a malformed pincode, or
/// `CommandError::Serviceability` if a remote lookup fails.
pub async fn pincode(ctx: &Context, code: &str) -> Result<(), CommandError> {
    let result = ctx.checker.check(code).await?;
    if result.is_format_rejection() {
        return Err(CommandError::Usage(result.message));
    }
    info!(
        code = %result.code,
        serviceable = result.serviceable,
        region = result.region.as_deref().unwrap_or("-"),
        "{}",
        result.message
    );
    Ok(())
}
